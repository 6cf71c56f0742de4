use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        description = r#"
Checkout, payment confirmation and order history for the storefront, plus the
back-office order listing and sales dashboard.

Authenticated endpoints expect `Authorization: Bearer <jwt>`. Stripe endpoints
are open so the hosted card form can call them directly.
        "#
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "orders", description = "Checkout and order history"),
        (name = "payments", description = "PayPal and Stripe confirmation"),
        (name = "admin", description = "Back-office endpoints"),
        (name = "health", description = "Liveness")
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_my_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::pay_order,
        crate::handlers::orders::mark_pickup_ready,
        crate::handlers::orders::list_orders_admin,
        crate::handlers::orders::dashboard,
        crate::handlers::payments::stripe_client_secret,
        crate::handlers::payments::stripe_confirm,
        crate::handlers::payments::stripe_publishable_key,
        crate::handlers::payments::paypal_client_id,
        crate::handlers::health::health,
    ),
    components(schemas(
        crate::entities::order::PaymentMethod,
        crate::services::orders::OrderDraft,
        crate::services::orders::OrderItemInput,
        crate::services::orders::ShippingInfo,
        crate::services::orders::OrderResponse,
        crate::services::orders::OrderItemResponse,
        crate::services::orders::PaymentResult,
        crate::services::orders::AdminOrderPage,
        crate::services::payments::PaypalCapture,
        crate::services::payments::PaypalPayer,
        crate::services::payments::StripeCheckout,
        crate::services::analytics::TimeRange,
        crate::services::analytics::DashboardAggregates,
        crate::services::analytics::TopProduct,
        crate::services::analytics::DepartmentRevenue,
        crate::services::analytics::SalesBucket,
        crate::handlers::payments::PaypalClientConfig,
        crate::handlers::health::HealthResponse,
        crate::errors::ErrorResponse
    ))
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
