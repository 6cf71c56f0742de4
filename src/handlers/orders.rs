use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    auth::{AdminUser, AuthUser},
    errors::ServiceError,
    handlers::common::{AdminOrderParams, JsonBody, PathParam, QueryParams},
    services::analytics::{DashboardAggregates, TimeRange},
    services::orders::{AdminOrderPage, AdminOrderQuery, OrderDraft, OrderResponse},
    services::payments::PaypalCapture,
    AppState,
};

/// Place an order from the checkout draft
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "orders",
    request_body = OrderDraft,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Malformed draft", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(draft): JsonBody<OrderDraft>,
) -> Result<(StatusCode, Json<OrderResponse>), ServiceError> {
    let order = state
        .services
        .orders
        .create_order(user.user_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List the caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/orders/mine",
    tag = "orders",
    responses(
        (status = 200, description = "Caller's orders", body = [OrderResponse]),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("Bearer" = []))
)]
pub async fn get_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ServiceError> {
    let orders = state.services.orders.get_own_orders(user.user_id).await?;
    Ok(Json(orders))
}

/// Get any order by id
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = OrderResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    _user: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<OrderResponse>, ServiceError> {
    Ok(Json(state.services.orders.get_order_by_id(id).await?))
}

/// Record a PayPal capture against the order
#[utoipa::path(
    put,
    path = "/api/orders/{id}/pay",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = PaypalCapture,
    responses(
        (status = 200, description = "Order marked paid", body = OrderResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn pay_order(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(capture): JsonBody<PaypalCapture>,
) -> Result<Json<OrderResponse>, ServiceError> {
    info!(order_id = %id, payer = %user.user_id, "PayPal capture received");
    let order = state.services.payments.confirm_paypal(id, capture).await?;
    Ok(Json(order))
}

/// Flag an order as ready for counter pickup
#[utoipa::path(
    put,
    path = "/api/orders/{id}/pickup-ready",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order flagged", body = OrderResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn mark_pickup_ready(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<OrderResponse>, ServiceError> {
    Ok(Json(state.services.orders.mark_pickup_ready(id).await?))
}

/// Back-office order listing
#[utoipa::path(
    get,
    path = "/api/orders/admin",
    tag = "admin",
    params(AdminOrderParams),
    responses(
        (status = 200, description = "One page of orders", body = AdminOrderPage),
        (status = 403, description = "Caller is not an admin"),
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders_admin(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    QueryParams(params): QueryParams<AdminOrderParams>,
) -> Result<Json<AdminOrderPage>, ServiceError> {
    let query = AdminOrderQuery {
        page: params.page.unwrap_or(1).max(1),
        limit: state.config.page_size(params.limit),
        search_term: params.search_term.clone(),
        pickup_ready: params.pickup_ready(),
    };
    Ok(Json(state.services.orders.list_orders_for_admin(query).await?))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardParams {
    /// daily, weekly, monthly or yearly (default daily)
    #[serde(default)]
    pub range: TimeRange,
}

/// Sales dashboard aggregates
#[utoipa::path(
    get,
    path = "/api/orders/dashboard",
    tag = "admin",
    params(DashboardParams),
    responses(
        (status = 200, description = "Dashboard figures", body = DashboardAggregates),
        (status = 403, description = "Caller is not an admin"),
    ),
    security(("Bearer" = []))
)]
pub async fn dashboard(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    QueryParams(params): QueryParams<DashboardParams>,
) -> Result<Json<DashboardAggregates>, ServiceError> {
    Ok(Json(
        state
            .services
            .analytics
            .get_dashboard_aggregates(params.range)
            .await?,
    ))
}
