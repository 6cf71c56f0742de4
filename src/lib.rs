//! Storefront API Library
//!
//! Checkout, payment confirmation and order history for a small storefront,
//! plus the client-side cart model the checkout draft is built from.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod cart;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::FromRef,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::services::stripe::PaymentIntentGateway;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        db: Arc<DbPool>,
        config: config::AppConfig,
        gateway: Option<Arc<dyn PaymentIntentGateway>>,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config, gateway);
        let auth = Arc::new(AuthService::from_config(&config));
        Self {
            db,
            config,
            services,
            auth,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Routes under `/api`. Static segments (`mine`, `admin`, `dashboard`, `key`,
/// `secret`) take priority over the `:id` captures beside them.
pub fn api_routes() -> Router<AppState> {
    let orders = Router::new()
        .route("/", post(handlers::orders::create_order))
        .route("/mine", get(handlers::orders::get_my_orders))
        .route("/admin", get(handlers::orders::list_orders_admin))
        .route("/dashboard", get(handlers::orders::dashboard))
        .route("/:id", get(handlers::orders::get_order))
        .route("/:id/pay", put(handlers::orders::pay_order))
        .route("/:id/pickup-ready", put(handlers::orders::mark_pickup_ready));

    let stripe = Router::new()
        .route("/key", get(handlers::payments::stripe_publishable_key))
        .route("/secret/:id", get(handlers::payments::stripe_client_secret))
        .route("/:id/secret", put(handlers::payments::stripe_confirm));

    Router::new()
        .nest("/orders", orders)
        .nest("/stripe", stripe)
        .route("/config/paypal", get(handlers::payments::paypal_client_id))
}

/// Full application router minus CORS, which depends on deployment config and
/// is layered on by the binary.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
