// handlers/orders/mod.rs - Online store orders paid with PIX
//
// POST /orders creates the gateway billing and a PENDING sale; payment is
// confirmed either by the provider webhook or by the buyer's page polling
// /orders/check-status.

pub mod create;      // POST /orders
pub mod fulfillment; // PATCH /orders/:id/deliver, GET /orders/pending
pub mod status;      // GET /orders/check-status/:paymentId
pub mod webhook;     // POST /orders/webhook/abacatepay

pub use create::create_order;
pub use fulfillment::{deliver, pending};
pub use status::check_status;
pub use webhook::abacatepay_webhook;
