#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::{json, Value};
use storefront_api::{
    auth::{AuthService, AuthUser},
    config::AppConfig,
    db,
    entities::{order, order_item, product, user},
    services::stripe::{PaymentIntentGateway, StripeClient},
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "storefront_test_secret_for_integration_runs_7d1e";

/// Helper harness for spinning up the full router over a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth: Arc<AuthService>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust configuration. A Stripe
    /// gateway is wired whenever `stripe_secret_key` ends up set.
    pub async fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "test".to_string(),
        );
        // One connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        configure(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let gateway = StripeClient::from_config(&cfg)
            .expect("stripe client for tests")
            .map(|client| Arc::new(client) as Arc<dyn PaymentIntentGateway>);

        let state = AppState::new(Arc::new(pool), cfg, gateway);
        let auth = state.auth.clone();
        let router = storefront_api::app_router(state.clone());

        Self {
            router,
            state,
            auth,
        }
    }

    pub fn token_for(&self, user: &AuthUser) -> String {
        self.auth.generate_token(user).expect("token for test user")
    }

    /// Inserts a user row and returns the identity a token would carry.
    pub async fn seed_user(&self, name: &str, is_admin: bool) -> AuthUser {
        let id = Uuid::new_v4();
        let email = format!("{}.{}@example.com", name.to_lowercase().replace(' ', "."), &id.to_string()[..8]);
        user::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            email: Set(email.clone()),
            is_admin: Set(is_admin),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed user for tests");

        AuthUser {
            user_id: id,
            name: name.to_string(),
            email,
            is_admin,
        }
    }

    pub async fn seed_product(&self, name: &str, department: &str, price: Decimal) -> product::Model {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            slug: Set(format!("{}-{}", name.to_lowercase().replace(' ', "-"), &id.to_string()[..8])),
            department: Set(department.to_string()),
            price: Set(price),
            count_in_stock: Set(25),
            image: Set(format!("/images/{}.jpg", id)),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product for tests")
    }

    /// Bulk-inserts `count` orders for `owner`, each with one line of `product`
    /// at `total`. Rows go in batches so no single insert outgrows the
    /// backend's bind-parameter limit.
    pub async fn seed_orders(
        &self,
        owner: Uuid,
        product: Uuid,
        count: usize,
        total: Decimal,
        paid: bool,
    ) {
        const BATCH: usize = 500;
        let now = Utc::now();
        let mut remaining = count;
        while remaining > 0 {
            let size = remaining.min(BATCH);
            remaining -= size;

            let ids: Vec<Uuid> = (0..size).map(|_| Uuid::new_v4()).collect();
            let orders = ids.iter().map(|id| order::ActiveModel {
                id: Set(*id),
                user_id: Set(owner),
                shipping_first_name: Set("Ada".into()),
                shipping_last_name: Set("Lovelace".into()),
                shipping_phone_number: Set("555-0100".into()),
                shipping_address: Set("1 Analytical Way".into()),
                shipping_city: Set("Austin".into()),
                shipping_region: Set("TX".into()),
                shipping_zip: Set("78701".into()),
                payment_method: Set(order::PaymentMethod::PayPal),
                payment_result_id: Set(paid.then(|| "PAYID-BULK".to_string())),
                payment_result_status: Set(paid.then(|| "COMPLETED".to_string())),
                payment_result_update_time: Set(paid.then(|| now.to_rfc3339())),
                payment_result_email_address: Set(paid.then(|| "ada@example.com".to_string())),
                items_price: Set(total),
                tax_price: Set(Decimal::ZERO),
                total_price: Set(total),
                is_paid: Set(paid),
                paid_at: Set(paid.then_some(now)),
                is_pickup_ready: Set(false),
                created_at: Set(now),
                updated_at: Set(now),
            });
            order::Entity::insert_many(orders)
                .exec_without_returning(&*self.state.db)
                .await
                .expect("seed orders for tests");

            let items = ids.iter().map(|id| order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(*id),
                position: Set(0),
                product_id: Set(product),
                name: Set("Trail Shoe".into()),
                slug: Set("trail-shoe".into()),
                image: Set(String::new()),
                price: Set(total),
                quantity: Set(1),
            });
            order_item::Entity::insert_many(items)
                .exec_without_returning(&*self.state.db)
                .await
                .expect("seed order items for tests");
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Places an order for `user` from a standard draft and returns the response body.
    pub async fn place_order(&self, user: &AuthUser, draft: Value) -> Value {
        let token = self.token_for(user);
        let response = self
            .request(Method::POST, "/api/orders", Some(draft), Some(&token))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Checkout draft for one product: 2 × 50.00, 8.25% tax, total 108.25.
pub fn order_draft(product: Uuid, payment_method: &str) -> Value {
    json!({
        "orderItems": [{
            "product": product,
            "name": "Trail Shoe",
            "slug": "trail-shoe",
            "image": "/images/trail-shoe.jpg",
            "price": "50.00",
            "quantity": 2
        }],
        "shippingInfo": {
            "firstName": "Ada",
            "lastName": "Lovelace",
            "phoneNumber": "555-0100",
            "address": "1 Analytical Way",
            "city": "Austin",
            "region": "TX",
            "zip": "78701"
        },
        "paymentMethod": payment_method,
        "itemsPrice": "100.00",
        "taxPrice": "8.25",
        "totalPrice": "108.25"
    })
}

pub fn decimal_field(body: &Value, field: &str) -> Decimal {
    body[field]
        .as_str()
        .unwrap_or_else(|| panic!("{field} should be a decimal string"))
        .parse()
        .unwrap_or_else(|_| panic!("{field} should parse as a decimal"))
}

pub fn timestamp_field(body: &Value, field: &str) -> chrono::DateTime<Utc> {
    body[field]
        .as_str()
        .unwrap_or_else(|| panic!("{field} should be a timestamp string"))
        .parse()
        .unwrap_or_else(|_| panic!("{field} should parse as RFC 3339"))
}
