// handlers/orders/fulfillment.rs - Store pickup queue

use axum::{extract::Path, response::Json};
use serde_json::{json, Value};

use crate::database::models::SaleDetail;
use crate::error::ApiResult;
use crate::extract::parse_id;
use crate::services::SaleService;

/// GET /orders/pending - paid sales waiting for pickup, oldest first
pub async fn pending() -> ApiResult<Json<Vec<SaleDetail>>> {
    let sales = SaleService::new().await?.awaiting_pickup().await?;
    Ok(Json(sales))
}

/// PATCH /orders/:id/deliver - 409 while the payment is still pending
pub async fn deliver(Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Order")?;
    let sale = SaleService::new().await?.deliver(id).await?;
    Ok(Json(json!({ "success": true, "sale": sale })))
}
