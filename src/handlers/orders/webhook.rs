// handlers/orders/webhook.rs - POST /orders/webhook/abacatepay handler
// Payment notifications pushed by the PIX provider

use axum::{extract::Query, http::StatusCode};
use serde::Deserialize;

use crate::config::config;
use crate::database::models::Sale;
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::services::{SaleService, ServiceResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookQuery {
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

impl WebhookEvent {
    /// Billing id of a payment confirmation, `None` for every other notification
    fn paid_billing(&self) -> Option<&str> {
        let data = self.data.as_ref()?;
        let paid = self.event.as_deref() == Some("billing.paid") || data.status.as_deref() == Some("PAID");
        if paid {
            data.id.as_deref().filter(|id| !id.is_empty())
        } else {
            None
        }
    }
}

fn authorize(expected: Option<&str>, given: Option<&str>) -> ApiResult<()> {
    match expected {
        Some(secret) if given != Some(secret) => Err(ApiError::unauthorized("Invalid webhook secret")),
        _ => Ok(()),
    }
}

async fn settle(billing_id: &str) -> ServiceResult<Option<Sale>> {
    SaleService::new().await?.mark_paid(billing_id).await
}

pub async fn abacatepay_webhook(
    Query(query): Query<WebhookQuery>,
    ValidJson(body): ValidJson<WebhookEvent>,
) -> ApiResult<StatusCode> {
    authorize(
        config().payment.webhook_secret.as_deref(),
        query.webhook_secret.as_deref(),
    )?;

    let data = body.data.as_ref();
    tracing::info!(
        "Webhook received: {} {} {}",
        body.event.as_deref().unwrap_or("-"),
        data.and_then(|d| d.id.as_deref()).unwrap_or("-"),
        data.and_then(|d| d.status.as_deref()).unwrap_or("-")
    );

    let Some(billing_id) = body.paid_billing() else {
        return Ok(StatusCode::OK);
    };

    match settle(billing_id).await {
        Ok(Some(_)) => Ok(StatusCode::OK),
        Ok(None) => {
            tracing::warn!("Webhook for unknown billing {}", billing_id);
            Ok(StatusCode::OK)
        }
        Err(e) => {
            tracing::error!("Webhook processing failed for {}: {}", billing_id, e);
            Err(ApiError::internal_server_error("Webhook processing failed"))
        }
    }
}
