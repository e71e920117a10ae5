// handlers/checkout.rs - Proof-of-payment checkout
//
// The buyer pays out-of-band and uploads the receipt; staff then approve,
// reject and hand over the order by its 4-character code.

use axum::{
    extract::{Multipart, Path},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path as FsPath;
use uuid::Uuid;

use crate::config::config;
use crate::database::models::OrderDetail;
use crate::error::{ApiError, ApiResult};
use crate::extract::{digits_only, parse_cart, parse_id, NumberOrString, ValidJson};
use crate::services::{Buyer, CartLine, CheckoutRequest, OrderService, PersonService, ProductService};
use crate::uploads::{discard_proof, store_proof};

/// Uploaded receipt, kept in memory until the form is validated
#[derive(Debug, Default)]
struct Proof {
    file_name: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct CheckoutForm {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    age: Option<String>,
    church: Option<String>,
    items: Option<String>,
    proof: Option<Proof>,
}

impl CheckoutForm {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = CheckoutForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "proof" {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Could not read proof: {}", e)))?;
                if !bytes.is_empty() {
                    form.proof = Some(Proof {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }

            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid field {}: {}", name, e)))?;
            let value = Some(text.trim().to_string()).filter(|v| !v.is_empty());
            match name.as_str() {
                "name" => form.name = value,
                "email" => form.email = value,
                "phone" => form.phone = value,
                "age" => form.age = value,
                "church" => form.church = value,
                "items" => form.items = value,
                _ => {}
            }
        }
        Ok(form)
    }

    fn validate(self) -> ApiResult<(Buyer, Vec<CartLine>, Option<Proof>)> {
        let (name, phone, items) = match (self.name, self.phone, self.items) {
            (Some(name), Some(phone), Some(items)) => (name, phone, items),
            _ => return Err(ApiError::bad_request("Name, phone and items are required")),
        };
        let cart = parse_cart(&Value::String(items))?;
        let phone = digits_only(&phone);
        let email = self
            .email
            .unwrap_or_else(|| format!("temp_{}@checkout.com", phone));
        let buyer = Buyer {
            name,
            email,
            phone,
            age: self.age.and_then(|a| NumberOrString::Text(a).as_age()),
            church: self.church,
            gender: None,
        };
        Ok((buyer, cart, self.proof))
    }
}

/**
 * POST /checkout/full - Order with an uploaded payment proof (multipart)
 *
 * Fields: `name`, `phone`, `items` (JSON array of `{productId, quantity}`)
 * are required; `email`, `age`, `church` and the `proof` file are optional.
 * Buyers without an email are keyed by `temp_<phone>@checkout.com`.
 */
pub async fn checkout_full(multipart: Multipart) -> ApiResult<Json<Value>> {
    let (buyer, cart, proof) = CheckoutForm::read(multipart).await?.validate()?;
    let upload_dir = FsPath::new(&config().api.upload_dir);

    let proof_url = match proof {
        Some(proof) => Some(
            store_proof(upload_dir, proof.file_name.as_deref(), &proof.bytes)
                .await
                .map_err(|e| {
                    tracing::error!("Could not store payment proof: {}", e);
                    ApiError::internal_server_error("Could not store payment proof")
                })?,
        ),
        None => None,
    };

    match place_order(&buyer, cart, proof_url.clone()).await {
        Ok((order_code, person_id)) => Ok(Json(json!({
            "success": true,
            "orderCode": order_code,
            "personId": person_id
        }))),
        Err(e) => {
            if let Some(url) = &proof_url {
                discard_proof(upload_dir, url).await;
            }
            Err(e)
        }
    }
}

/// Buyer upsert and order insert; returns the order code and the buyer id
async fn place_order(buyer: &Buyer, cart: Vec<CartLine>, proof_url: Option<String>) -> ApiResult<(String, Uuid)> {
    let person = PersonService::new().await?.upsert_buyer(buyer).await?;
    let product_ids: Vec<Uuid> = cart.iter().map(|l| l.product_id).collect();
    let catalogue = ProductService::new().await?.find_many(&product_ids).await?;

    let request = CheckoutRequest {
        buyer: person,
        proof_url,
        items: cart,
    };
    let order = OrderService::new().await?.create(&request, &catalogue).await?;
    Ok((order.order_code, request.buyer.id))
}

/// GET /checkout/orders/pending - orders with a proof awaiting review, newest first
pub async fn pending_orders() -> ApiResult<Json<Vec<OrderDetail>>> {
    let orders = OrderService::new().await?.pending_with_proof().await?;
    Ok(Json(orders))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCodeRequest {
    #[serde(default)]
    pub order_code: Option<String>,
}

impl OrderCodeRequest {
    fn code(&self) -> ApiResult<&str> {
        self.order_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::invalid_field("orderCode", "Order code is required"))
    }
}

/// POST /checkout/orders/pay
pub async fn pay_order(ValidJson(body): ValidJson<OrderCodeRequest>) -> ApiResult<Json<Value>> {
    let order = OrderService::new().await?.mark_paid(body.code()?).await?;
    tracing::info!("Checkout order {} approved", order.order_code);
    Ok(Json(json!({ "success": true, "order": order })))
}

/// POST /checkout/orders/reject
pub async fn reject_order(ValidJson(body): ValidJson<OrderCodeRequest>) -> ApiResult<Json<Value>> {
    OrderService::new().await?.reject(body.code()?).await?;
    Ok(Json(json!({ "success": true, "message": "Order removed" })))
}

/// POST /checkout/orders/deliver
pub async fn deliver_order(ValidJson(body): ValidJson<OrderCodeRequest>) -> ApiResult<Json<Value>> {
    let order = OrderService::new().await?.mark_delivered(body.code()?).await?;
    tracing::info!("Checkout order {} delivered", order.order_code);
    Ok(Json(json!({ "success": true, "order": order })))
}

/// GET /checkout/orders/:code - voucher lookup
pub async fn order_by_code(Path(code): Path<String>) -> ApiResult<Json<OrderDetail>> {
    OrderService::new()
        .await?
        .find_by_code(&code)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Order not found"))
}

/// GET /checkout/person/:id/orders - what is still to be handed to a person
pub async fn person_orders(Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Person")?;
    let person = PersonService::new()
        .await?
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Person not found"))?;
    let orders = OrderService::new().await?.open_for_person(person.id).await?;
    Ok(Json(json!({ "personName": person.name, "orders": orders })))
}
