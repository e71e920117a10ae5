// handlers/orders/create.rs - POST /orders handler

use axum::{response::Json, Extension};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::config;
use crate::database::models::Product;
use crate::error::{ApiError, ApiResult};
use crate::extract::{blank_as_none, digits_only, loose_age, parse_cart, ValidJson};
use crate::payment::tax_id::{is_valid_cpf, normalize_cpf};
use crate::payment::{BillingProduct, BillingRequest, CustomerRequest, SharedGateway};
use crate::services::{price_cart, Buyer, CartLine, PersonService, PixSale, ProductService, SaleLine, SaleService};
use crate::types::Gender;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub cpf: Option<String>,
    #[serde(default, deserialize_with = "loose_age")]
    pub age: Option<i32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub church: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<String>,
    #[serde(default)]
    pub items: Value,
}

/// Buyer data and cart of a validated order
#[derive(Debug)]
struct OrderDraft {
    buyer: Buyer,
    tax_id: String,
    cart: Vec<CartLine>,
}

impl CreateOrderRequest {
    fn validate(self) -> ApiResult<OrderDraft> {
        let (name, email, phone, cpf) = match (self.name, self.email, self.phone, self.cpf) {
            (Some(name), Some(email), Some(phone), Some(cpf)) => (name, email, phone, cpf),
            _ => return Err(ApiError::bad_request("Missing required buyer data")),
        };
        if !is_valid_cpf(&cpf) {
            return Err(ApiError::invalid_field("cpf", "Invalid CPF"));
        }
        let cart = parse_cart(&self.items)?;
        Ok(OrderDraft {
            buyer: Buyer {
                name,
                email,
                phone: digits_only(&phone),
                age: self.age,
                church: self.church,
                gender: self.gender.as_deref().and_then(Gender::parse_loose),
            },
            tax_id: normalize_cpf(&cpf),
            cart,
        })
    }
}

fn cents(price: Decimal) -> i64 {
    (price * Decimal::ONE_HUNDRED).round().to_i64().unwrap_or_default()
}

/// Priced sale lines plus the matching gateway products
fn billing_lines(cart: &[CartLine], catalogue: &[Product]) -> (Vec<SaleLine>, Vec<BillingProduct>) {
    let by_id: HashMap<Uuid, &Product> = catalogue.iter().map(|p| (p.id, p)).collect();
    let (kept, _) = price_cart(cart, catalogue);
    kept.into_iter()
        .filter_map(|line| by_id.get(&line.product_id).map(|p| (line, *p)))
        .map(|(line, product)| {
            (
                SaleLine {
                    product_id: product.id,
                    quantity: line.quantity,
                    price: product.price,
                },
                BillingProduct {
                    external_id: product.id.to_string(),
                    name: product.name.clone(),
                    quantity: line.quantity,
                    price: cents(product.price),
                },
            )
        })
        .unzip()
}

/**
 * POST /orders - Create a PIX billing for a store order
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "string",             // Required
 *   "email": "string",            // Required: buyer is upserted by email
 *   "phone": "string",            // Required
 *   "cpf": "123.456.789-09",      // Required: check digits are verified
 *   "age": 30,                    // Optional
 *   "church": "string",           // Optional
 *   "gender": "F",                // Optional: defaults to M for new buyers
 *   "items": [{ "productId": "uuid", "quantity": 1 }]  // Array or JSON string
 * }
 * ```
 *
 * Returns the PENDING sale and `pixData { paymentId, copyPaste }`.
 */
pub async fn create_order(
    Extension(gateway): Extension<SharedGateway>,
    ValidJson(body): ValidJson<CreateOrderRequest>,
) -> ApiResult<Json<Value>> {
    let draft = body.validate()?;

    let product_ids: Vec<Uuid> = draft.cart.iter().map(|l| l.product_id).collect();
    let catalogue = ProductService::new().await?.find_many(&product_ids).await?;
    let (lines, products) = billing_lines(&draft.cart, &catalogue);
    if lines.is_empty() {
        return Err(ApiError::invalid_field("items", "No valid products in cart"));
    }

    let buyer = PersonService::new().await?.upsert_buyer(&draft.buyer).await?;

    let customer = CustomerRequest {
        name: draft.buyer.name.clone(),
        email: draft.buyer.email.clone(),
        cellphone: draft.buyer.phone.clone(),
        tax_id: draft.tax_id,
    };
    let customer_id = gateway
        .ensure_customer(&customer)
        .await?
        .ok_or_else(|| ApiError::bad_request("Could not register the payment customer"))?;

    let payment = &config().payment;
    let billing = gateway
        .create_billing(&BillingRequest::pix(
            customer_id,
            products,
            payment.return_url.clone(),
            payment.completion_url.clone(),
        ))
        .await?;

    let sale = SaleService::new()
        .await?
        .create_pix(&PixSale {
            external_id: billing.id.clone(),
            buyer,
            items: lines,
        })
        .await?;
    tracing::info!("PIX order {} created, billing {}", sale.order_code, billing.id);

    Ok(Json(json!({
        "sale": sale,
        "pixData": {
            "paymentId": billing.id,
            "copyPaste": billing.copy_paste()
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(name: &str, price: Decimal) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            price,
            category: "LOJA".into(),
            image_url: None,
            created_at: Utc::now(),
        }
    }

    fn request(value: Value) -> CreateOrderRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_buyer_data_is_rejected() {
        let err = request(json!({ "name": "Ana", "email": "ana@x.com", "phone": "61999990000" }))
            .validate()
            .unwrap_err();
        assert_eq!(err.message(), "Missing required buyer data");
    }

    #[test]
    fn cpf_is_checked_before_the_cart() {
        let err = request(json!({
            "name": "Ana", "email": "ana@x.com", "phone": "61999990000", "cpf": "111.111.111-11",
            "items": []
        }))
        .validate()
        .unwrap_err();
        assert_eq!(err.message(), "Invalid CPF");
    }

    #[test]
    fn valid_orders_normalise_phone_and_cpf() {
        let id = Uuid::new_v4();
        let draft = request(json!({
            "name": "Ana", "email": "ana@x.com", "phone": "(61) 99999-0000", "cpf": "529.982.247-25",
            "items": format!("[{{\"productId\":\"{}\",\"quantity\":3}}]", id)
        }))
        .validate()
        .unwrap();
        assert_eq!(draft.buyer.phone, "61999990000");
        assert_eq!(draft.tax_id, "52998224725");
        assert_eq!(draft.cart, vec![CartLine { product_id: id, quantity: 3 }]);
    }

    #[test]
    fn billing_uses_catalogue_prices_in_cents() {
        let shirt = product("Camiseta", Decimal::new(5990, 2));
        let cart = vec![
            CartLine { product_id: shirt.id, quantity: 2 },
            CartLine { product_id: Uuid::new_v4(), quantity: 1 },
        ];
        let (lines, products) = billing_lines(&cart, &[shirt.clone()]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].price, Decimal::new(5990, 2));
        assert_eq!(products[0].price, 5990);
        assert_eq!(products[0].quantity, 2);
        assert_eq!(products[0].name, "Camiseta");
    }
}
