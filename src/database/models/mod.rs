pub mod checkpoint;
pub mod meeting;
pub mod order;
pub mod person;
pub mod product;
pub mod sale;

pub use checkpoint::{Checkpoint, ManualEntry, Movement};
pub use meeting::Meeting;
pub use order::{Order, OrderDetail, OrderItem, OrderItemDetail};
pub use person::{Person, PersonWithPresence};
pub use product::Product;
pub use sale::{Sale, SaleDetail, SaleItem, SaleItemDetail};
