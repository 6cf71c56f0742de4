pub mod common;
pub mod health;
pub mod orders;
pub mod payments;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        analytics::AnalyticsService, orders::OrderService, payments::PaymentService,
        stripe::PaymentIntentGateway,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    /// Wires the services over one connection pool. `gateway` is `None` when
    /// card payments are not configured.
    pub fn new(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        gateway: Option<Arc<dyn PaymentIntentGateway>>,
    ) -> Self {
        let orders = Arc::new(OrderService::new(db_pool.clone()));
        let payments = Arc::new(PaymentService::new(
            db_pool.clone(),
            orders.clone(),
            gateway,
            config.default_currency.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(db_pool));

        Self {
            orders,
            payments,
            analytics,
        }
    }
}
