use crate::{
    db::DbPool,
    entities::order::{ActiveModel as OrderActiveModel, Entity as OrderEntity},
    errors::ServiceError,
    services::orders::{OrderResponse, OrderService, PaymentResult},
    services::stripe::{PaymentIntentGateway, PaymentIntentRequest},
};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Capture details posted by the PayPal checkout button.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaypalCapture {
    pub id: String,
    pub status: String,
    pub update_time: String,
    pub payer: PaypalPayer,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaypalPayer {
    pub email_address: String,
}

impl From<PaypalCapture> for PaymentResult {
    fn from(capture: PaypalCapture) -> Self {
        PaymentResult {
            id: capture.id,
            status: capture.status,
            update_time: capture.update_time,
            email_address: capture.payer.email_address,
        }
    }
}

/// Response for the Stripe checkout bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StripeCheckout {
    pub order: OrderResponse,
    pub client_secret: String,
}

/// Converts a major-unit amount into minor units, rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| ServiceError::BadRequest(format!("Amount {} is out of range", amount)))
}

/// Records provider confirmations and bootstraps card payments.
#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    orders: Arc<OrderService>,
    gateway: Option<Arc<dyn PaymentIntentGateway>>,
    currency: String,
}

impl PaymentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        orders: Arc<OrderService>,
        gateway: Option<Arc<dyn PaymentIntentGateway>>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            db_pool,
            orders,
            gateway,
            currency: currency.into(),
        }
    }

    /// Marks the order paid with `result`. No already-paid guard and no amount
    /// check: a second confirmation overwrites the first and re-stamps `paid_at`.
    #[instrument(skip(self, result), fields(payment_id = %result.id))]
    pub async fn mark_paid(
        &self,
        order_id: Uuid,
        result: PaymentResult,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let existing = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to load order for payment");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::not_found_order(order_id))?;

        if existing.is_paid {
            warn!(order_id = %order_id, "Order already paid; overwriting payment result");
        }

        let mut active: OrderActiveModel = existing.into();
        active.is_paid = Set(true);
        active.paid_at = Set(Some(Utc::now()));
        active.payment_result_id = Set(Some(result.id));
        active.payment_result_status = Set(Some(result.status));
        active.payment_result_update_time = Set(Some(result.update_time));
        active.payment_result_email_address = Set(Some(result.email_address));
        active.update(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to record payment");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, "Order marked paid");
        self.orders.get_order_by_id(order_id).await
    }

    /// PayPal path: the storefront forwards the capture payload after approval.
    pub async fn confirm_paypal(
        &self,
        order_id: Uuid,
        capture: PaypalCapture,
    ) -> Result<OrderResponse, ServiceError> {
        self.mark_paid(order_id, capture.into()).await
    }

    /// Stripe path: creates a payment intent for the order total. An unknown
    /// order is `NotFound` whether or not Stripe is configured.
    #[instrument(skip(self))]
    pub async fn create_payment_intent(
        &self,
        order_id: Uuid,
    ) -> Result<StripeCheckout, ServiceError> {
        let order = self.orders.get_order_by_id(order_id).await?;
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| ServiceError::ServiceUnavailable("Stripe is not configured".into()))?;

        let request = PaymentIntentRequest {
            amount: to_minor_units(order.total_price)?,
            currency: self.currency.clone(),
            order_id,
        };

        let intent = gateway.create_payment_intent(&request).await?;
        info!(order_id = %order_id, intent_id = %intent.id, amount = request.amount, "Payment intent created");

        Ok(StripeCheckout {
            order,
            client_secret: intent.client_secret,
        })
    }
}
