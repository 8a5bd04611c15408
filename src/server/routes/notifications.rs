use crate::error::ApiError;
use crate::server::guards::auth::Authenticated;
use crate::server::router::AppState;
use crate::store::notifications::{STATUS_READ, STATUS_UNREAD, TABLE};

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Serialize;
use serde_json::{Value, json};
use vectorshop_schema::{Count, Empty, Envelope};

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Value>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/{id}/read", put(mark_read))
        .route("/api/notifications/unread/count", get(unread_count))
}

async fn list_notifications(
    State(state): State<AppState>,
    caller: Authenticated,
) -> Result<Json<Envelope<NotificationList>>, ApiError> {
    let notifications = state
        .supabase
        .from(TABLE)
        .eq("send_to_user_id", caller.id())
        .order("created_at", false)
        .fetch()
        .await?;
    Ok(Json(Envelope::ok(NotificationList { notifications })))
}

/// PUT /api/notifications/{id}/read
///
/// Only the caller's own notifications are touched; an unknown id is a no-op.
async fn mark_read(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    state
        .supabase
        .from(TABLE)
        .eq("id", &id)
        .eq("send_to_user_id", caller.id())
        .update_silent(&json!({ "status": STATUS_READ }))
        .await?;
    Ok(Json(Envelope::done()))
}

async fn unread_count(
    State(state): State<AppState>,
    caller: Authenticated,
) -> Result<Json<Envelope<Count>>, ApiError> {
    let count = state
        .supabase
        .from(TABLE)
        .eq("send_to_user_id", caller.id())
        .eq("status", STATUS_UNREAD)
        .count()
        .await?;
    Ok(Json(Envelope::ok(Count { count })))
}
