// handlers/operations/sales.rs - POST /operations/sales handler
// Store sale typed in by staff, paid on the spot (cash, card, PIX machine)

use axum::response::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::{blank_as_none, ValidJson};
use crate::services::{ManualSale, SaleLine, SaleService};
use crate::types::{Gender, PersonType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSaleRequest {
    pub checkpoint_id: Uuid,
    pub payment_method: String,
    #[serde(default)]
    pub buyer_type: Option<PersonType>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub buyer_gender: Option<String>,
    pub items: Vec<SaleItemRequest>,
}

impl ManualSaleRequest {
    fn validate(self) -> ApiResult<ManualSale> {
        if self.payment_method.trim().is_empty() {
            return Err(ApiError::invalid_field("paymentMethod", "Payment method is required"));
        }
        if self.items.is_empty() {
            return Err(ApiError::invalid_field("items", "At least one item is required"));
        }
        if self.items.iter().any(|i| i.quantity < 1) {
            return Err(ApiError::invalid_field("items", "Quantity must be at least 1"));
        }
        if self.items.iter().any(|i| i.price.is_sign_negative()) {
            return Err(ApiError::invalid_field("items", "Price cannot be negative"));
        }
        Ok(ManualSale {
            checkpoint_id: self.checkpoint_id,
            payment_method: self.payment_method.trim().to_string(),
            buyer_type: self.buyer_type.unwrap_or(PersonType::Visitor),
            buyer_gender: self
                .buyer_gender
                .as_deref()
                .and_then(Gender::parse_loose)
                .unwrap_or(Gender::Male),
            items: self
                .items
                .into_iter()
                .map(|i| SaleLine {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    price: i.price,
                })
                .collect(),
        })
    }
}

/**
 * POST /operations/sales - Register a paid store sale
 *
 * Expected Input:
 * ```json
 * {
 *   "checkpointId": "uuid",
 *   "paymentMethod": "DINHEIRO",
 *   "buyerType": "MEMBER",      // Optional: defaults to VISITOR
 *   "buyerGender": "F",         // Optional: defaults to M
 *   "items": [{ "productId": "uuid", "quantity": 2, "price": 25.0 }]
 * }
 * ```
 */
pub async fn manual_sale(ValidJson(body): ValidJson<ManualSaleRequest>) -> ApiResult<Json<Value>> {
    let sale = body.validate()?;
    let stored = SaleService::new().await?.create_manual(&sale).await?;
    tracing::info!("Store sale {} registered, total {}", stored.order_code, stored.total);
    Ok(Json(json!({ "success": true, "sale": stored })))
}
