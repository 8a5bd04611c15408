mod common;

use axum::http::{Method, StatusCode};
use common::{ANA_ID, ANA_TOKEN, TestApp};
use serde_json::json;

const COD: &str = "ecd09068-bebe-48ff-b834-9e4932619fa0";

#[tokio::test]
async fn single_order_is_stamped_and_notified() {
    let app = TestApp::new().await;
    app.upstream.respond(
        Method::POST,
        "orders",
        201,
        json!({"id": 31, "user_id": ANA_ID, "total": 50000}),
    );

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(ANA_TOKEN),
            json!({"total": 50000, "user_id": "someone-else"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["order"]["id"], 31);

    let insert = &app.upstream.calls(Method::POST, "orders")[0];
    assert_eq!(insert.body["user_id"], ANA_ID);
    assert_eq!(insert.body["total"], 50000);
    assert!(insert.body["created_at"].as_str().unwrap().ends_with('Z'));

    let notification = &app.upstream.calls(Method::POST, "notifications")[0];
    assert_eq!(
        notification.body,
        json!({
            "send_to_user_id": ANA_ID,
            "notif_type": "ORDER",
            "notif_title": "Order Received",
            "notif_contents": "Your order #31 has been received and is being processed.",
            "status": "UNREAD"
        })
    );
}

#[tokio::test]
async fn failed_notification_does_not_fail_the_order() {
    let app = TestApp::new().await;
    app.upstream.respond(
        Method::POST,
        "notifications",
        500,
        json!({"code": "XX000", "message": "boom"}),
    );

    let (status, body) = app
        .call(Method::POST, "/api/orders", Some(ANA_TOKEN), json!({"total": 1}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["user_id"], ANA_ID);
}

#[tokio::test]
async fn bulk_checkout_sets_status_per_payment_method() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders/bulk",
            Some(ANA_TOKEN),
            json!({
                "orders": [
                    {"total": 10, "payment_detail": {"method_id": COD}},
                    {"total": 20, "payment_detail": {"method_id": "bank-transfer"}, "status": "paid"}
                ],
                "cartItemIds": [4, 5]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);

    let insert = &app.upstream.calls(Method::POST, "orders")[0];
    assert_eq!(insert.body[0]["status"], "pending");
    assert_eq!(insert.body[1]["status"], "payment");
    assert_eq!(insert.body[0]["user_id"], ANA_ID);
    assert_eq!(insert.body[0]["created_at"], insert.body[1]["created_at"]);

    let delete = &app.upstream.calls(Method::DELETE, "my_cart")[0];
    assert_eq!(delete.param("id"), Some(r#"in.("4","5")"#));
    assert_eq!(delete.param("user_id"), Some(format!("eq.{ANA_ID}").as_str()));

    let notifications = app.upstream.calls(Method::POST, "notifications");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].body["notif_title"], "Orders Received");
    assert_eq!(
        notifications[0].body["notif_contents"],
        "Your 2 orders have been received and are being processed."
    );
}

#[tokio::test]
async fn bulk_checkout_survives_cart_cleanup_failure() {
    let app = TestApp::new().await;
    app.upstream.respond(
        Method::DELETE,
        "my_cart",
        500,
        json!({"code": "XX000", "message": "cleanup failed"}),
    );

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders/bulk",
            Some(ANA_TOKEN),
            json!({"orders": [{"total": 10}], "cartItemIds": [4]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"][0]["status"], "payment");
    assert_eq!(app.upstream.calls(Method::POST, "notifications").len(), 1);
}

#[tokio::test]
async fn bulk_checkout_without_cart_ids_leaves_cart_alone() {
    let app = TestApp::new().await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/orders/bulk",
            Some(ANA_TOKEN),
            json!({"orders": [{"total": 10}]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.upstream.calls(Method::DELETE, "my_cart").is_empty());
}

#[tokio::test]
async fn bulk_checkout_rejects_empty_and_malformed_bodies() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders/bulk",
            Some(ANA_TOKEN),
            json!({"orders": []}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No orders provided");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders/bulk",
            Some(ANA_TOKEN),
            json!({"cartItemIds": [1]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(app.upstream.requests().is_empty());
}

#[tokio::test]
async fn failed_order_insert_is_a_server_error() {
    let app = TestApp::new().await;
    app.upstream.respond(
        Method::POST,
        "orders",
        400,
        json!({"code": "23502", "message": "null value in column \"total\""}),
    );

    let (status, body) = app
        .call(Method::POST, "/api/orders", Some(ANA_TOKEN), json!({}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "null value in column \"total\"");
    assert!(app.upstream.calls(Method::POST, "notifications").is_empty());
}
