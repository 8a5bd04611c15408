//! Exp and points adjustments used by the admin panel.
//!
//! Every endpoint needs a valid access token. The amount is checked before the
//! target row is looked up.

use crate::error::ApiError;
use crate::server::guards::auth::Authenticated;
use crate::server::router::AppState;
use crate::store::leaderboard::USERS_TABLE;
use crate::store::progress::{self, Adjustment, ExpTarget};

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde_json::{Map, Value};
use tracing::info;
use vectorshop_schema::{AdjustExpRequest, AdjustPointsRequest, Data, Envelope};

const POINTS_COLUMN: &str = "points";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/add-exp", post(add_exp))
        .route("/api/admin/reduce-exp", post(reduce_exp))
        .route("/api/admin/add-points", post(add_points))
        .route("/api/admin/reduce-points", post(reduce_points))
}

async fn add_exp(
    State(state): State<AppState>,
    caller: Authenticated,
    payload: Result<Json<AdjustExpRequest>, JsonRejection>,
) -> Result<Json<Envelope<Data<Value>>>, ApiError> {
    adjust_exp(&state, &caller, payload, Adjustment::Add).await
}

async fn reduce_exp(
    State(state): State<AppState>,
    caller: Authenticated,
    payload: Result<Json<AdjustExpRequest>, JsonRejection>,
) -> Result<Json<Envelope<Data<Value>>>, ApiError> {
    adjust_exp(&state, &caller, payload, Adjustment::Reduce).await
}

async fn add_points(
    State(state): State<AppState>,
    caller: Authenticated,
    payload: Result<Json<AdjustPointsRequest>, JsonRejection>,
) -> Result<Json<Envelope<Data<Value>>>, ApiError> {
    adjust_points(&state, &caller, payload, Adjustment::Add).await
}

async fn reduce_points(
    State(state): State<AppState>,
    caller: Authenticated,
    payload: Result<Json<AdjustPointsRequest>, JsonRejection>,
) -> Result<Json<Envelope<Data<Value>>>, ApiError> {
    adjust_points(&state, &caller, payload, Adjustment::Reduce).await
}

/// The row matched by `key_column = key`, reduced to `column`.
async fn balance_row(
    state: &AppState,
    table: &str,
    key_column: &str,
    key: &str,
    column: &str,
) -> Result<Option<Map<String, Value>>, ApiError> {
    Ok(state
        .supabase
        .from(table)
        .select(column)
        .eq(key_column, key)
        .fetch_optional()
        .await?)
}

async fn adjust_exp(
    state: &AppState,
    caller: &Authenticated,
    payload: Result<Json<AdjustExpRequest>, JsonRejection>,
    adjustment: Adjustment,
) -> Result<Json<Envelope<Data<Value>>>, ApiError> {
    let Json(req) = payload?;
    let amount = progress::valid_amount(req.exp_amount)
        .ok_or_else(|| ApiError::BadRequest("Invalid exp_amount".to_string()))?;
    let target = ExpTarget::resolve(req.user_id, req.display_id).ok_or_else(|| {
        ApiError::BadRequest("Either user_id or display_id must be provided".to_string())
    })?;

    let key = target.key();
    let column = target.exp_column();
    let row = balance_row(state, target.table(), target.key_column(), &key, column)
        .await?
        .ok_or_else(|| ApiError::NotFound(target.not_found_message().to_string()))?;

    let balance = adjustment.apply(row.get(column).and_then(Value::as_i64), amount);
    let mut patch = Map::new();
    patch.insert(column.to_string(), Value::from(balance));

    let updated: Value = state
        .supabase
        .from(target.table())
        .eq(target.key_column(), &key)
        .update_single(&patch)
        .await?;

    info!(
        admin = %caller.id(),
        table = target.table(),
        key = %key,
        ?adjustment,
        amount,
        balance,
        "Exp adjusted"
    );

    Ok(Json(
        Envelope::ok(Data { data: updated }).with_message(adjustment.exp_message(&target)),
    ))
}

async fn adjust_points(
    state: &AppState,
    caller: &Authenticated,
    payload: Result<Json<AdjustPointsRequest>, JsonRejection>,
    adjustment: Adjustment,
) -> Result<Json<Envelope<Data<Value>>>, ApiError> {
    let Json(req) = payload?;
    let amount = progress::valid_amount(req.points_amount)
        .ok_or_else(|| ApiError::BadRequest("Invalid points_amount".to_string()))?;
    let user_id = req
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("User ID is required".to_string()))?;

    let row = balance_row(state, USERS_TABLE, "id", &user_id, POINTS_COLUMN)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let balance = adjustment.apply(row.get(POINTS_COLUMN).and_then(Value::as_i64), amount);
    let mut patch = Map::new();
    patch.insert(POINTS_COLUMN.to_string(), Value::from(balance));

    let updated: Value = state
        .supabase
        .from(USERS_TABLE)
        .eq("id", &user_id)
        .update_single(&patch)
        .await?;

    info!(
        admin = %caller.id(),
        user_id = %user_id,
        ?adjustment,
        amount,
        balance,
        "Points adjusted"
    );

    Ok(Json(
        Envelope::ok(Data { data: updated }).with_message(adjustment.points_message()),
    ))
}
