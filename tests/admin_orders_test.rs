mod common;

use axum::http::{Method, StatusCode};
use common::{order_draft, response_json, TestApp};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn pagination_reports_page_count() {
    let app = TestApp::new().await;
    let admin = app.seed_user("Back Office", true).await;
    let customer = app.seed_user("Ada Lovelace", false).await;
    for _ in 0..25 {
        app.place_order(&customer, order_draft(Uuid::new_v4(), "PayPal"))
            .await;
    }
    let token = app.token_for(&admin);

    let response = app
        .request(Method::GET, "/api/orders/admin?page=1&limit=10", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = response_json(response).await;
    assert_eq!(first["pages"], json!(3));
    assert_eq!(first["orders"].as_array().unwrap().len(), 10);
    assert_eq!(first["orders"][0]["userName"], json!("Ada Lovelace"));

    let response = app
        .request(Method::GET, "/api/orders/admin?page=3&limit=10", None, Some(&token))
        .await;
    let last = response_json(response).await;
    assert_eq!(last["pages"], json!(3));
    assert_eq!(last["orders"].as_array().unwrap().len(), 5);

    let response = app
        .request(Method::GET, "/api/orders/admin?page=4&limit=10", None, Some(&token))
        .await;
    let beyond = response_json(response).await;
    assert_eq!(beyond["orders"], json!([]));
}

#[tokio::test]
async fn empty_query_values_fall_back_to_defaults() {
    let app = TestApp::new().await;
    let admin = app.seed_user("Back Office", true).await;
    let customer = app.seed_user("Ada Lovelace", false).await;
    for _ in 0..12 {
        app.place_order(&customer, order_draft(Uuid::new_v4(), "Stripe"))
            .await;
    }
    let token = app.token_for(&admin);

    let response = app
        .request(
            Method::GET,
            "/api/orders/admin?page=&limit=&searchTerm=&isPickupReadyFilter=",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["pages"], json!(2));
    assert_eq!(body["orders"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn search_matches_owner_name_case_insensitively() {
    let app = TestApp::new().await;
    let admin = app.seed_user("Back Office", true).await;
    let ada = app.seed_user("Ada Lovelace", false).await;
    let grace = app.seed_user("Grace Hopper", false).await;
    app.place_order(&ada, order_draft(Uuid::new_v4(), "PayPal")).await;
    app.place_order(&grace, order_draft(Uuid::new_v4(), "PayPal")).await;
    app.place_order(&grace, order_draft(Uuid::new_v4(), "Stripe")).await;
    let token = app.token_for(&admin);

    let response = app
        .request(Method::GET, "/api/orders/admin?searchTerm=hOPp", None, Some(&token))
        .await;
    let body = response_json(response).await;
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["user"] == json!(grace.user_id)));
    assert_eq!(body["pages"], json!(1));

    let response = app
        .request(Method::GET, "/api/orders/admin?searchTerm=nobody", None, Some(&token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["orders"], json!([]));
    assert_eq!(body["pages"], json!(0));
}

#[tokio::test]
async fn pickup_flag_filters_and_sorts_pending_first() {
    let app = TestApp::new().await;
    let admin = app.seed_user("Back Office", true).await;
    let customer = app.seed_user("Ada Lovelace", false).await;
    let token = app.token_for(&admin);

    let ready = app
        .place_order(&customer, order_draft(Uuid::new_v4(), "PayPal"))
        .await;
    let pending = app
        .place_order(&customer, order_draft(Uuid::new_v4(), "PayPal"))
        .await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/orders/{}/pickup-ready", ready["id"].as_str().unwrap()),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["isPickupReady"], json!(true));

    let response = app
        .request(Method::GET, "/api/orders/admin", None, Some(&token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["orders"][0]["id"], pending["id"]);
    assert_eq!(body["orders"][1]["id"], ready["id"]);

    let response = app
        .request(
            Method::GET,
            "/api/orders/admin?isPickupReadyFilter=true",
            None,
            Some(&token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    assert_eq!(body["orders"][0]["id"], ready["id"]);

    let response = app
        .request(
            Method::GET,
            "/api/orders/admin?isPickupReadyFilter=false",
            None,
            Some(&token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    assert_eq!(body["orders"][0]["id"], pending["id"]);
}

#[tokio::test]
async fn back_office_requires_admin() {
    let app = TestApp::new().await;
    let customer = app.seed_user("Ada Lovelace", false).await;
    let token = app.token_for(&customer);
    let order = app
        .place_order(&customer, order_draft(Uuid::new_v4(), "PayPal"))
        .await;

    for (method, uri) in [
        (Method::GET, "/api/orders/admin".to_string()),
        (Method::GET, "/api/orders/dashboard".to_string()),
        (
            Method::PUT,
            format!("/api/orders/{}/pickup-ready", order["id"].as_str().unwrap()),
        ),
    ] {
        let response = app.request(method.clone(), &uri, None, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        let body = response_json(response).await;
        assert_eq!(body["error"]["code"], json!("AUTH_INSUFFICIENT_PERMISSIONS"));

        let response = app.request(method.clone(), &uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn pickup_ready_on_unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let admin = app.seed_user("Back Office", true).await;
    let token = app.token_for(&admin);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/orders/{}/pickup-ready", Uuid::new_v4()),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_id_and_page_are_reported_as_json_400s() {
    let app = TestApp::new().await;
    let admin = app.seed_user("Back Office", true).await;
    let token = app.token_for(&admin);

    for (method, uri) in [
        (Method::PUT, "/api/orders/not-a-uuid/pickup-ready"),
        (Method::GET, "/api/orders/admin?page=abc"),
    ] {
        let response = app.request(method.clone(), uri, None, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method} {uri}");
        let body = response_json(response).await;
        assert_eq!(body["error"], json!("Bad Request"), "{method} {uri}");
    }
}
