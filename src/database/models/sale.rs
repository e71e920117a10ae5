use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Person, Product};
use crate::types::{Gender, PersonType, SaleStatus};

/// Store sale, either entered by staff or paid through the PIX gateway
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub order_code: String,
    /// Billing id at the payment gateway
    pub external_id: Option<String>,
    pub checkpoint_id: Option<Uuid>,
    pub person_id: Option<Uuid>,
    pub payment_method: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub status: SaleStatus,
    pub buyer_name: Option<String>,
    pub buyer_type: Option<PersonType>,
    pub buyer_gender: Option<Gender>,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemDetail {
    #[serde(flatten)]
    pub item: SaleItem,
    pub product: Option<Product>,
}

/// Sale with its items and buyer, as shown on the pickup queue
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
    pub person: Option<Person>,
}
