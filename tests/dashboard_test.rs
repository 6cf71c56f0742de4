mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{decimal_field, order_draft, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn dashboard_counts_paid_revenue_and_buckets_all_sales() {
    let app = TestApp::new().await;
    let admin = app.seed_user("Back Office", true).await;
    let customer = app.seed_user("Ada Lovelace", false).await;
    let shoe = app.seed_product("Trail Shoe", "Footwear", dec!(50.00)).await;
    let jacket = app.seed_product("Rain Jacket", "Apparel", dec!(50.00)).await;

    let paid = app.place_order(&customer, order_draft(shoe.id, "PayPal")).await;
    app.place_order(&customer, order_draft(jacket.id, "Stripe")).await;

    let customer_token = app.token_for(&customer);
    let response = app
        .request(
            Method::PUT,
            &format!("/api/orders/{}/pay", paid["id"].as_str().unwrap()),
            Some(json!({
                "id": "PAYID-DASH",
                "status": "COMPLETED",
                "update_time": "2024-05-01T10:00:00Z",
                "payer": { "email_address": "ada@example.com" }
            })),
            Some(&customer_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = app.token_for(&admin);
    let response = app
        .request(Method::GET, "/api/orders/dashboard?range=yearly", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    assert_eq!(body["range"], json!("yearly"));
    assert_eq!(body["totalUsers"], json!(2));
    assert_eq!(body["totalOrders"], json!(2));
    assert_eq!(decimal_field(&body, "totalRevenue"), dec!(108.25));

    let top = body["topProducts"].as_array().unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0]["product"], json!(shoe.id));
    assert_eq!(top[0]["quantitySold"], json!(2));

    let departments = body["revenueByDepartment"].as_array().unwrap();
    assert_eq!(departments.len(), 1);
    assert_eq!(departments[0]["department"], json!("Footwear"));
    assert_eq!(decimal_field(&departments[0], "revenue"), dec!(100.00));

    let sales = body["sales"].as_array().unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0]["period"], json!(Utc::now().format("%Y").to_string()));
    assert_eq!(sales[0]["orderCount"], json!(2));
    assert_eq!(decimal_field(&sales[0], "total"), dec!(216.50));
}

#[tokio::test]
async fn dashboard_defaults_to_daily_and_rejects_unknown_ranges() {
    let app = TestApp::new().await;
    let admin = app.seed_user("Back Office", true).await;
    let token = app.token_for(&admin);

    let response = app
        .request(Method::GET, "/api/orders/dashboard", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["range"], json!("daily"));
    assert_eq!(body["totalOrders"], json!(0));
    assert_eq!(body["sales"], json!([]));

    let response = app
        .request(Method::GET, "/api/orders/dashboard?range=hourly", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["error"], json!("Bad Request"));
}

#[tokio::test]
async fn dashboard_scales_past_bind_parameter_limits() {
    let app = TestApp::new().await;
    let admin = app.seed_user("Back Office", true).await;
    let customer = app.seed_user("Ada Lovelace", false).await;
    let shoe = app.seed_product("Trail Shoe", "Footwear", dec!(1.00)).await;

    app.seed_orders(customer.user_id, shoe.id, 33_000, dec!(1.00), true)
        .await;
    app.seed_orders(customer.user_id, shoe.id, 10, dec!(1.00), false)
        .await;

    let token = app.token_for(&admin);
    let response = app
        .request(Method::GET, "/api/orders/dashboard?range=yearly", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    assert_eq!(body["totalOrders"], json!(33_010));
    assert_eq!(decimal_field(&body, "totalRevenue"), dec!(33000));
    assert_eq!(body["topProducts"][0]["quantitySold"], json!(33_000));
    assert_eq!(
        decimal_field(&body["revenueByDepartment"][0], "revenue"),
        dec!(33000)
    );
    assert_eq!(body["sales"][0]["orderCount"], json!(33_010));
}
