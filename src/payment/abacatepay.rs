use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{Billing, BillingRequest, BillingStatus, CustomerRequest, PaymentError, PaymentGateway};
use crate::config::PaymentConfig;

/// HTTP client for the AbacatePay v1 API
#[derive(Debug, Clone)]
pub struct AbacatePayClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl AbacatePayClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, PaymentError> {
        // Trailing slash so `join` appends instead of replacing the last segment
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Client for the configured account, `None` when no API key is set
    pub fn from_config(config: &PaymentConfig) -> Result<Option<Self>, PaymentError> {
        match &config.api_key {
            Some(key) => {
                let client = Self::new(&config.base_url, key, Duration::from_secs(config.timeout_secs))?;
                info!("Payment gateway configured at {}", client.base_url);
                Ok(Some(client))
            }
            None => Ok(None),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentError> {
        Ok(self.base_url.join(path)?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, PaymentError> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body: Value = response.json().await?;
        unwrap_envelope(body)
    }
}

/// Responses come as `{data, error}`; older endpoints return the payload bare
fn unwrap_envelope(body: Value) -> Result<Value, PaymentError> {
    let data = body.get("data").filter(|d| !d.is_null()).cloned();
    match (data, body.get("error")) {
        (Some(data), _) => Ok(data),
        (None, Some(error)) if !error.is_null() => Err(PaymentError::Rejected(match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        (None, _) => Ok(body),
    }
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Customers carry their contact data either at the top level or under `metadata`
fn customer_matches(customer: &Value, email: &str, tax_id: &str) -> bool {
    let scopes = [Some(customer), customer.get("metadata")];
    scopes.into_iter().flatten().any(|scope| {
        let email_hit = scope
            .get("email")
            .and_then(Value::as_str)
            .is_some_and(|e| e.eq_ignore_ascii_case(email));
        let tax_hit = scope
            .get("taxId")
            .and_then(Value::as_str)
            .is_some_and(|t| t == tax_id);
        email_hit || tax_hit
    })
}

fn parse_billing(data: &Value) -> Result<Billing, PaymentError> {
    let id = string_field(data, "id").ok_or(PaymentError::MissingField("id"))?;
    let pix_code = data
        .get("pix")
        .and_then(|pix| pix.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(Billing {
        id,
        url: string_field(data, "url"),
        pix_code,
    })
}

/// `billing/list` may answer with the whole list or with the single billing
fn pick_billing(data: &Value, billing_id: &str) -> Option<BillingStatus> {
    let bill = match data {
        Value::Array(list) => list
            .iter()
            .find(|b| b.get("id").and_then(Value::as_str) == Some(billing_id))?,
        Value::Object(_) => data,
        _ => return None,
    };
    Some(BillingStatus {
        id: string_field(bill, "id").unwrap_or_else(|| billing_id.to_string()),
        status: match bill.get("status") {
            Some(Value::String(s)) => s.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => String::new(),
        },
    })
}

#[async_trait]
impl PaymentGateway for AbacatePayClient {
    async fn create_customer(&self, customer: &CustomerRequest) -> Result<String, PaymentError> {
        let url = self.endpoint("customer/create")?;
        let data = self.send(self.http.post(url).json(customer)).await?;
        string_field(&data, "id").ok_or(PaymentError::MissingField("id"))
    }

    async fn find_customer(&self, email: &str, tax_id: &str) -> Result<Option<String>, PaymentError> {
        let url = self.endpoint("customer/list")?;
        let data = self.send(self.http.get(url)).await?;
        let found = data
            .as_array()
            .and_then(|list| list.iter().find(|c| customer_matches(c, email, tax_id)))
            .and_then(|c| string_field(c, "id"));
        debug!("Customer lookup for {} found {:?}", email, found);
        Ok(found)
    }

    async fn create_billing(&self, billing: &BillingRequest) -> Result<Billing, PaymentError> {
        let url = self.endpoint("billing/create")?;
        let data = self.send(self.http.post(url).json(billing)).await?;
        parse_billing(&data)
    }

    async fn find_billing(&self, billing_id: &str) -> Result<Option<BillingStatus>, PaymentError> {
        let url = self.endpoint("billing/list")?;
        let data = self
            .send(self.http.get(url).query(&[("id", billing_id)]))
            .await?;
        Ok(pick_billing(&data, billing_id))
    }
}
