use crate::error::ApiError;
use crate::server::guards::auth::Authenticated;
use crate::server::router::AppState;
use crate::store::{
    cart,
    notifications::{self, NewNotification},
    orders::{self, TABLE},
};
use crate::supabase::SupabaseClient;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};
use vectorshop_schema::{BulkOrderRequest, Envelope};

#[derive(Debug, Serialize)]
pub struct PlacedOrder {
    pub order: Value,
}

#[derive(Debug, Serialize)]
pub struct PlacedOrders {
    pub orders: Vec<Value>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(create_order))
        .route("/api/orders/bulk", post(create_orders))
}

/// The order is already stored, so a failed notification only gets logged.
async fn notify(db: &SupabaseClient, notification: NewNotification) {
    if let Err(err) = db
        .from(notifications::TABLE)
        .insert::<_, Value>(&notification)
        .await
    {
        warn!(
            user_id = %notification.send_to_user_id,
            error = %err,
            "Order notification not stored"
        );
    }
}

/// POST /api/orders
async fn create_order(
    State(state): State<AppState>,
    caller: Authenticated,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Envelope<PlacedOrder>>, ApiError> {
    let Json(body) = payload?;
    let row = orders::stamp(body, caller.id(), &orders::now_timestamp());

    let order: Value = state.supabase.from(TABLE).insert_single(&row).await?;
    let order_id = order.get("id").cloned().unwrap_or(Value::Null);
    info!(user_id = %caller.id(), order_id = %order_id, "Order placed");

    notify(
        &state.supabase,
        NewNotification::order_received(caller.id(), &order_id),
    )
    .await;

    Ok(Json(Envelope::ok(PlacedOrder { order })))
}

/// POST /api/orders/bulk
///
/// Checkout from the cart: every order gets its initial status from its payment
/// method, and the cart lines it came from are removed afterwards.
async fn create_orders(
    State(state): State<AppState>,
    caller: Authenticated,
    payload: Result<Json<BulkOrderRequest>, JsonRejection>,
) -> Result<Json<Envelope<PlacedOrders>>, ApiError> {
    let Json(req) = payload?;
    if req.orders.is_empty() {
        return Err(ApiError::BadRequest("No orders provided".to_string()));
    }

    let created_at = orders::now_timestamp();
    let cod = state.store.cash_on_delivery_method_id.as_str();
    let rows: Vec<Map<String, Value>> = req
        .orders
        .into_iter()
        .map(|order| orders::stamp_with_status(order, caller.id(), &created_at, cod))
        .collect();

    let placed: Vec<Value> = state.supabase.from(TABLE).insert(&rows).await?;
    info!(user_id = %caller.id(), count = placed.len(), "Orders placed");

    if !req.cart_item_ids.is_empty()
        && let Err(err) = state
            .supabase
            .from(cart::TABLE)
            .in_("id", &req.cart_item_ids)
            .eq("user_id", caller.id())
            .delete()
            .await
    {
        warn!(user_id = %caller.id(), error = %err, "Ordered cart lines not removed");
    }

    notify(
        &state.supabase,
        NewNotification::orders_received(caller.id(), placed.len()),
    )
    .await;

    Ok(Json(Envelope::ok(PlacedOrders { orders: placed })))
}
