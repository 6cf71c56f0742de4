use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Payment intent as returned by the provider; only the fields checkout needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    /// Amount in the currency's minor unit (cents for usd)
    pub amount: i64,
    pub currency: String,
    pub order_id: Uuid,
}

/// Seam over the card processor so checkout can be exercised without Stripe.
#[async_trait]
pub trait PaymentIntentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Thin client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    /// Returns `None` when no secret key is configured.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, ServiceError> {
        match config
            .stripe_secret_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
        {
            Some(key) => Self::new(
                config.stripe_api_base.clone(),
                key,
                config.payment_timeout(),
            )
            .map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PaymentIntentGateway for StripeClient {
    #[instrument(skip(self), fields(order_id = %request.order_id, amount = request.amount))]
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, ServiceError> {
        let url = format!("{}/v1/payment_intents", self.api_base);
        let order_id = request.order_id.to_string();
        let amount = request.amount.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", request.currency.as_str()),
            ("metadata[order_id]", order_id.as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Stripe request failed");
                ServiceError::ExternalServiceError(format!("Stripe request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<StripeErrorEnvelope>()
                .await
                .ok()
                .and_then(|env| env.error.message.or(env.error.kind))
                .unwrap_or_else(|| status.to_string());
            error!(status = %status, detail = %detail, "Stripe rejected payment intent");
            return Err(ServiceError::ExternalServiceError(format!(
                "Stripe rejected payment intent: {}",
                detail
            )));
        }

        response.json::<PaymentIntent>().await.map_err(|e| {
            error!(error = %e, "Unreadable Stripe response");
            ServiceError::ExternalServiceError(format!("Unreadable Stripe response: {}", e))
        })
    }
}
