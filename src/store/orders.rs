use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub const TABLE: &str = "orders";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_AWAITING_PAYMENT: &str = "payment";

/// Cash on delivery ships straight away; every other method waits for payment.
pub fn initial_status(order: &Map<String, Value>, cash_on_delivery_id: &str) -> &'static str {
    let method = order
        .get("payment_detail")
        .and_then(|detail| detail.get("method_id"))
        .and_then(Value::as_str);

    if method == Some(cash_on_delivery_id) {
        STATUS_PENDING
    } else {
        STATUS_AWAITING_PAYMENT
    }
}

/// Timestamp in the `2024-01-31T09:15:00.000Z` form.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Sets the server-owned columns, overriding anything the client sent for them.
pub fn stamp(mut order: Map<String, Value>, user_id: &str, created_at: &str) -> Map<String, Value> {
    order.insert("user_id".to_string(), Value::from(user_id));
    order.insert("created_at".to_string(), Value::from(created_at));
    order
}

pub fn stamp_with_status(
    order: Map<String, Value>,
    user_id: &str,
    created_at: &str,
    cash_on_delivery_id: &str,
) -> Map<String, Value> {
    let status = initial_status(&order, cash_on_delivery_id);
    let mut order = stamp(order, user_id, created_at);
    order.insert("status".to_string(), Value::from(status));
    order
}
