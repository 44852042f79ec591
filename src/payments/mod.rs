mod paypal;

pub use paypal::PayPalGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Payment gateway credentials are not configured")]
    NotConfigured,
    #[error("Payment gateway request failed: {0}")]
    Http(String),
    #[error("Payment gateway returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// What the client is about to pay for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Decimal amount as a string, e.g. `"10.00"`
    pub amount: String,
    pub currency: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub id: String,
    pub status: String,
}

/// Outcome of capturing an approved order.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub order_id: String,
    pub capture_id: Option<String>,
    pub status: String,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub raw: serde_json::Value,
}

impl CaptureOutcome {
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETED")
    }

    /// Read capture details out of a raw checkout-orders capture payload.
    pub fn from_payload(order_id: &str, raw: serde_json::Value) -> Self {
        let capture = raw
            .pointer("/purchase_units/0/payments/captures/0")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let text = |value: &serde_json::Value, ptr: &str| {
            value.pointer(ptr).and_then(|v| v.as_str()).map(str::to_string)
        };

        CaptureOutcome {
            order_id: text(&raw, "/id").unwrap_or_else(|| order_id.to_string()),
            capture_id: text(&capture, "/id"),
            status: text(&raw, "/status").unwrap_or_else(|| "UNKNOWN".to_string()),
            amount: text(&capture, "/amount/value"),
            currency: text(&capture, "/amount/currency_code"),
            raw,
        }
    }
}

/// Hosted checkout provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder, GatewayError>;
    async fn capture_order(&self, order_id: &str) -> Result<CaptureOutcome, GatewayError>;
}
