use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    handlers::common::{JsonBody, PathParam},
    services::orders::{OrderResponse, PaymentResult},
    services::payments::StripeCheckout,
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaypalClientConfig {
    pub client_id: String,
}

/// Create a Stripe payment intent for the order total
#[utoipa::path(
    get,
    path = "/api/stripe/secret/{id}",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order and client secret", body = StripeCheckout),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Stripe rejected the request", body = crate::errors::ErrorResponse),
        (status = 503, description = "Stripe not configured", body = crate::errors::ErrorResponse),
    )
)]
pub async fn stripe_client_secret(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<StripeCheckout>, ServiceError> {
    Ok(Json(state.services.payments.create_payment_intent(id).await?))
}

/// Record a confirmed Stripe payment against the order
#[utoipa::path(
    put,
    path = "/api/stripe/{id}/secret",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = PaymentResult,
    responses(
        (status = 200, description = "Order marked paid", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn stripe_confirm(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(result): JsonBody<PaymentResult>,
) -> Result<Json<OrderResponse>, ServiceError> {
    Ok(Json(state.services.payments.mark_paid(id, result).await?))
}

/// Stripe publishable key for the storefront
#[utoipa::path(
    get,
    path = "/api/stripe/key",
    tag = "payments",
    responses(
        (status = 200, description = "Publishable key", body = String),
        (status = 503, description = "Stripe not configured", body = crate::errors::ErrorResponse),
    )
)]
pub async fn stripe_publishable_key(
    State(state): State<AppState>,
) -> Result<Json<String>, ServiceError> {
    state
        .config
        .stripe_publishable_key
        .clone()
        .filter(|key| !key.is_empty())
        .map(Json)
        .ok_or_else(|| ServiceError::ServiceUnavailable("Stripe is not configured".into()))
}

/// PayPal client id for the checkout button
#[utoipa::path(
    get,
    path = "/api/config/paypal",
    tag = "payments",
    responses(
        (status = 200, description = "PayPal client id", body = PaypalClientConfig),
        (status = 503, description = "PayPal not configured", body = crate::errors::ErrorResponse),
    )
)]
pub async fn paypal_client_id(
    State(state): State<AppState>,
) -> Result<Json<PaypalClientConfig>, ServiceError> {
    state
        .config
        .paypal_client_id
        .clone()
        .filter(|id| !id.is_empty())
        .map(|client_id| Json(PaypalClientConfig { client_id }))
        .ok_or_else(|| ServiceError::ServiceUnavailable("PayPal is not configured".into()))
}
