// handlers/config.rs - GET /config/churches handler

use axum::response::Json;

use crate::config::config;

/// Churches offered in the registration forms
pub async fn churches() -> Json<Vec<String>> {
    Json(config().event.churches.clone())
}
