//! PIX payment gateway seam.
//!
//! The store talks to the provider only through [`PaymentGateway`], so the
//! HTTP client can be swapped for [`UnconfiguredGateway`] when no API key is
//! set, or for a mock server in tests.

pub mod abacatepay;
pub mod tax_id;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub use abacatepay::AbacatePayClient;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway is not configured")]
    NotConfigured,

    #[error("invalid gateway URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("gateway rejected the request: {0}")]
    Rejected(String),

    #[error("gateway response is missing `{0}`")]
    MissingField(&'static str),
}

/// Buyer registered at the gateway before billing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub name: String,
    pub email: String,
    pub cellphone: String,
    pub tax_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingProduct {
    pub external_id: String,
    pub name: String,
    pub quantity: i32,
    /// Unit price in cents
    pub price: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRequest {
    pub frequency: &'static str,
    pub methods: Vec<&'static str>,
    pub customer_id: String,
    pub products: Vec<BillingProduct>,
    pub return_url: String,
    pub completion_url: String,
}

impl BillingRequest {
    /// One-time PIX charge
    pub fn pix(
        customer_id: String,
        products: Vec<BillingProduct>,
        return_url: String,
        completion_url: String,
    ) -> Self {
        Self {
            frequency: "ONE_TIME",
            methods: vec!["PIX"],
            customer_id,
            products,
            return_url,
            completion_url,
        }
    }
}

/// Billing created at the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Billing {
    pub id: String,
    pub url: Option<String>,
    pub pix_code: Option<String>,
}

impl Billing {
    /// What the buyer pastes into their bank app; the hosted page when no PIX code came back
    pub fn copy_paste(&self) -> Option<String> {
        self.pix_code.clone().or_else(|| self.url.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingStatus {
    pub id: String,
    pub status: String,
}

impl BillingStatus {
    /// The provider has reported both spellings in different API versions
    pub fn is_settled(&self) -> bool {
        matches!(self.status.to_ascii_uppercase().as_str(), "PAID" | "COMPLETED")
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register a customer and return the gateway id
    async fn create_customer(&self, customer: &CustomerRequest) -> Result<String, PaymentError>;

    /// Find an existing customer by email or tax id
    async fn find_customer(&self, email: &str, tax_id: &str) -> Result<Option<String>, PaymentError>;

    async fn create_billing(&self, billing: &BillingRequest) -> Result<Billing, PaymentError>;

    /// Current state of a billing, `None` when the gateway does not know it
    async fn find_billing(&self, billing_id: &str) -> Result<Option<BillingStatus>, PaymentError>;

    /// Create the customer, falling back to a lookup when the gateway refuses a duplicate
    async fn ensure_customer(&self, customer: &CustomerRequest) -> Result<Option<String>, PaymentError> {
        match self.create_customer(customer).await {
            Ok(id) => Ok(Some(id)),
            Err(PaymentError::NotConfigured) => Err(PaymentError::NotConfigured),
            Err(e) => {
                tracing::warn!("Customer creation failed ({}), looking up existing customer", e);
                self.find_customer(&customer.email, &customer.tax_id).await
            }
        }
    }
}

/// Gateway handle shared with the handlers through an `Extension`
pub type SharedGateway = Arc<dyn PaymentGateway>;

/// Gateway for the configured account, or [`UnconfiguredGateway`] when no API key is set
pub fn gateway_from_config(config: &crate::config::PaymentConfig) -> Result<SharedGateway, PaymentError> {
    Ok(match AbacatePayClient::from_config(config)? {
        Some(client) => Arc::new(client),
        None => {
            tracing::warn!("ABACATEPAY_API_KEY not set, online payment disabled");
            Arc::new(UnconfiguredGateway)
        }
    })
}

/// Stand-in used when no API key is configured; every call fails with `NotConfigured`
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    async fn create_customer(&self, _customer: &CustomerRequest) -> Result<String, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    async fn find_customer(&self, _email: &str, _tax_id: &str) -> Result<Option<String>, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    async fn create_billing(&self, _billing: &BillingRequest) -> Result<Billing, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    async fn find_billing(&self, _billing_id: &str) -> Result<Option<BillingStatus>, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}
