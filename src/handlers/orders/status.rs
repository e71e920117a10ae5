// handlers/orders/status.rs - GET /orders/check-status/:paymentId handler
// Polled by the payment page until the PIX billing is settled

use axum::{
    extract::Path,
    http::header,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::{json, Value};

use crate::payment::SharedGateway;
use crate::services::{ServiceResult, SaleService};

const NO_CACHE: [(header::HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, proxy-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

fn pending() -> Value {
    json!({ "status": "PENDING" })
}

async fn settle(payment_id: &str) -> ServiceResult<Option<String>> {
    let sale = SaleService::new().await?.mark_paid(payment_id).await?;
    Ok(sale.map(|s| s.order_code))
}

async fn poll(gateway: &SharedGateway, payment_id: &str) -> Value {
    let billing = match gateway.find_billing(payment_id).await {
        Ok(Some(billing)) => billing,
        Ok(None) => {
            tracing::warn!("Billing {} not found at the gateway", payment_id);
            return pending();
        }
        Err(e) => {
            tracing::warn!("Could not check billing {}: {}", payment_id, e);
            return pending();
        }
    };
    tracing::debug!("Billing {} is {}", payment_id, billing.status);
    if !billing.is_settled() {
        return pending();
    }

    match settle(payment_id).await {
        Ok(Some(order_code)) => json!({ "status": "PAID", "orderCode": order_code }),
        Ok(None) => pending(),
        Err(e) => {
            tracing::error!("Could not settle sale for billing {}: {}", payment_id, e);
            pending()
        }
    }
}

/// Anything short of a confirmed, stored payment reads as PENDING
pub async fn check_status(
    Extension(gateway): Extension<SharedGateway>,
    Path(payment_id): Path<String>,
) -> Response {
    let body = poll(&gateway, payment_id.trim()).await;
    (NO_CACHE, Json(body)).into_response()
}
