mod common;

use axum::http::{Method, StatusCode};
use common::{ANA_TOKEN, TestApp, TestOptions};
use serde_json::json;

async fn retrying_app() -> TestApp {
    TestApp::with_options(TestOptions {
        retry_max_times: 2,
        ..Default::default()
    })
    .await
}

#[tokio::test]
async fn reads_are_retried_after_server_errors() {
    let app = retrying_app().await;
    app.upstream
        .respond(Method::GET, "products", 503, json!({"message": "upstream unavailable"}))
        .respond(Method::GET, "products", 200, json!([{"id": "p1", "name": "Mug"}]));

    let (status, body) = app.get("/api/products", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Mug");
    assert_eq!(app.upstream.calls(Method::GET, "products").len(), 2);
}

#[tokio::test]
async fn reads_give_up_after_the_retry_budget() {
    let app = retrying_app().await;
    for _ in 0..3 {
        app.upstream
            .respond(Method::GET, "banners", 502, json!({"message": "bad gateway"}));
    }

    let (status, body) = app.get("/api/banners", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(app.upstream.calls(Method::GET, "banners").len(), 3);
}

#[tokio::test]
async fn rejected_reads_are_not_retried() {
    let app = retrying_app().await;
    app.upstream.respond(
        Method::GET,
        "products",
        400,
        json!({"code": "42703", "message": "column products.created_at does not exist"}),
    );

    let (status, _) = app.get("/api/products", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.upstream.calls(Method::GET, "products").len(), 1);
}

#[tokio::test]
async fn writes_are_never_retried() {
    let app = retrying_app().await;
    app.upstream
        .respond(Method::POST, "orders", 503, json!({"message": "upstream unavailable"}));

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(ANA_TOKEN),
            json!({"total": 50000}),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "upstream unavailable");
    assert_eq!(app.upstream.calls(Method::POST, "orders").len(), 1);
    assert!(app.upstream.calls(Method::POST, "notifications").is_empty());
}
