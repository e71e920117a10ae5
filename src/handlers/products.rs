// handlers/products.rs - Store catalogue handlers

use axum::{
    extract::{Path, Query},
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::Product;
use crate::error::{ApiError, ApiResult};
use crate::extract::{blank_as_none, parse_id, ValidJson};
use crate::services::{NewProduct, ProductService};

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// GET /products?category= - catalogue by name
pub async fn list_products(Query(query): Query<CategoryQuery>) -> ApiResult<Json<Vec<Product>>> {
    let products = ProductService::new()
        .await?
        .list(query.category.as_deref())
        .await?;
    Ok(Json(products))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub image_url: Option<String>,
}

impl CreateProductRequest {
    fn validate(self) -> ApiResult<NewProduct> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::invalid_field("name", "Name is required"));
        }
        if self.price.is_sign_negative() {
            return Err(ApiError::invalid_field("price", "Price cannot be negative"));
        }
        Ok(NewProduct {
            name,
            description: self.description,
            price: self.price.round_dp(2),
            category: self.category,
            image_url: self.image_url,
        })
    }
}

/**
 * POST /products - Add a product to the catalogue
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "Camiseta Ekklesia",  // Required
 *   "price": 59.9,                // Required
 *   "category": "LOJA",           // Optional: LOJA or CANTINA, defaults to LOJA
 *   "description": "string",      // Optional
 *   "imageUrl": "string"          // Optional
 * }
 * ```
 */
pub async fn create_product(ValidJson(body): ValidJson<CreateProductRequest>) -> ApiResult<Json<Product>> {
    let product = ProductService::new().await?.create(body.validate()?).await?;
    Ok(Json(product))
}

/// DELETE /products/:id
pub async fn delete_product(Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Product")?;
    ProductService::new().await?.delete(id).await?;
    Ok(Json(json!({ "success": true })))
}
