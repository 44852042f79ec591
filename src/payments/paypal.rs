use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{CaptureOutcome, CreatedOrder, GatewayError, OrderRequest, PaymentGateway};
use crate::config::PaypalConfig;

/// PayPal REST (checkout orders v2) gateway.
pub struct PayPalGateway {
    api_base: String,
    client: Client,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl PayPalGateway {
    pub fn new(config: &PaypalConfig) -> Result<Self, anyhow::Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_base: config.api_base.clone(),
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    /// Client-credentials grant. Tokens are not cached; each call fetches one.
    async fn access_token(&self) -> Result<String, GatewayError> {
        let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) else {
            return Err(GatewayError::NotConfigured);
        };

        let resp = self
            .client
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(id, Some(secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let resp = check_status(resp).await?;
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;
        Ok(token.access_token)
    }

    fn orders_url(&self) -> String {
        format!("{}/v2/checkout/orders", self.api_base)
    }

    fn capture_url(&self, order_id: &str) -> String {
        format!("{}/v2/checkout/orders/{}/capture", self.api_base, order_id)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::Api { status, body })
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder, GatewayError> {
        let token = self.access_token().await?;

        let body = serde_json::json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "description": order.description,
                "amount": {
                    "currency_code": order.currency,
                    "value": order.amount,
                },
            }],
        });

        let resp = self
            .client
            .post(self.orders_url())
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let resp = check_status(resp).await?;
        resp.json::<CreatedOrder>()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))
    }

    async fn capture_order(&self, order_id: &str) -> Result<CaptureOutcome, GatewayError> {
        let token = self.access_token().await?;

        let resp = self
            .client
            .post(self.capture_url(order_id))
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let resp = check_status(resp).await?;
        let raw: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        Ok(CaptureOutcome::from_payload(order_id, raw))
    }
}
