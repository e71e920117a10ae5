pub mod manager;
pub mod models;
pub mod seed;

pub use manager::{is_foreign_key_violation, is_unique_violation, DatabaseError, DatabaseManager};
