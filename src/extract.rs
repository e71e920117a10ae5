//! Request extraction helpers shared by the handlers.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::CartLine;

/// `Json<T>` whose rejection is reported in the API error envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => ApiError::validation_error(err.body_text(), None),
        JsonRejection::JsonSyntaxError(_) => ApiError::invalid_json("Request body is not valid JSON"),
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::bad_request("Expected request with `Content-Type: application/json`")
        }
        other => ApiError::bad_request(other.body_text()),
    }
}

/// A value clients send either as a JSON number or as a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    /// Whole number, or `None` when blank, zero or unparseable
    pub fn as_age(&self) -> Option<i32> {
        let value = match self {
            NumberOrString::Number(n) => *n,
            NumberOrString::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        if !value.is_finite() || value <= 0.0 || value > 150.0 {
            return None;
        }
        Some(value.trunc() as i32)
    }
}

/// Deserialize an optional age sent as a number or a string
pub fn loose_age<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.as_age()))
}

/// Deserialize an optional string, treating `""` and whitespace as absent
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// Path or body identifier; a malformed id can never match a row
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(format!("{} not found", what)))
}

/// Keep only the digits of a phone number or document
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Minimal shape check: something@something.tld without spaces
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCartItem {
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    quantity: Option<NumberOrString>,
}

/// Cart sent as a JSON array or as a string holding one (multipart forms).
/// Lines whose product id is not a UUID are dropped, quantities default to 1.
pub fn parse_cart(items: &serde_json::Value) -> Result<Vec<CartLine>, ApiError> {
    let decoded;
    let items = match items {
        serde_json::Value::String(text) => {
            decoded = serde_json::from_str::<serde_json::Value>(text)
                .map_err(|_| ApiError::invalid_field("items", "Items must be a JSON array"))?;
            &decoded
        }
        other => other,
    };
    let raw: Vec<RawCartItem> = serde_json::from_value(items.clone())
        .map_err(|_| ApiError::invalid_field("items", "Items must be a JSON array"))?;
    if raw.is_empty() {
        return Err(ApiError::invalid_field("items", "Cart is empty"));
    }
    Ok(raw
        .into_iter()
        .filter_map(|item| {
            let product_id = Uuid::parse_str(item.product_id?.trim()).ok()?;
            let quantity = match item.quantity {
                Some(NumberOrString::Number(n)) if n.is_finite() => n.trunc() as i32,
                Some(NumberOrString::Text(s)) => s.trim().parse().unwrap_or(1),
                _ => 1,
            };
            Some(CartLine {
                product_id,
                quantity: quantity.max(1),
            })
        })
        .collect())
}
