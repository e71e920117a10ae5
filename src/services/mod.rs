pub mod checkpoint_service;
pub mod dashboard_service;
pub mod meeting_service;
pub mod order_service;
pub mod person_service;
pub mod product_service;
pub mod sale_service;

pub use checkpoint_service::{CheckpointService, CountOutcome, NewManualEntry, ScanDecision, ScanOutcome};
pub use dashboard_service::DashboardService;
pub use meeting_service::{MeetingService, NewMeeting, MEETING_COUNT_KEY};
pub use order_service::{price_cart, CartLine, CheckoutRequest, OrderService};
pub use person_service::{Buyer, NewPerson, PersonService, PersonUpdate, QuickRegistration};
pub use product_service::{NewProduct, ProductService};
pub use sale_service::{ManualSale, PixSale, SaleLine, SaleService};

use thiserror::Error;
use uuid::Uuid;

use crate::database::{is_unique_violation, DatabaseError};

/// Errors raised by the store services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(DatabaseError::Sqlx(err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

const CODE_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Tries before giving up on a free order code
pub(crate) const ORDER_CODE_ATTEMPTS: usize = 5;

/// Upper-case base-36 code built from the random bits of a v4 UUID
pub fn order_code(len: usize) -> String {
    let mut bits = Uuid::new_v4().as_u128();
    let mut code = String::with_capacity(len);
    for _ in 0..len {
        code.push(CODE_ALPHABET[(bits % 36) as usize] as char);
        bits /= 36;
    }
    code
}

/// Whether a failed insert should be retried with a fresh order code
pub fn is_code_collision(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            is_unique_violation(err) && db.constraint().is_some_and(|c| c.contains("order_code"))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_codes_are_upper_base36() {
        for len in [4, 6] {
            let code = order_code(len);
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn order_codes_vary() {
        let codes: std::collections::HashSet<String> = (0..50).map(|_| order_code(6)).collect();
        assert!(codes.len() > 45);
    }

    #[test]
    fn only_database_errors_are_collisions() {
        assert!(!is_code_collision(&sqlx::Error::RowNotFound));
    }
}
