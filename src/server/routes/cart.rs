use crate::error::ApiError;
use crate::server::guards::auth::Authenticated;
use crate::server::router::AppState;
use crate::store::cart::{self, ITEMS_WITH_PRODUCT, TABLE, VARIANT_COLUMNS};
use crate::store::products::VARIANTS_TABLE;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{delete, get, post, put},
};
use serde_json::Value;
use vectorshop_schema::{
    AddToCartRequest, CartRow, Count, Data, DeleteCartItemsRequest, Empty, Envelope,
    UpdateCartRequest, VariantRow,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cart/add", post(add_to_cart))
        .route("/api/cart/update/{id}", put(update_quantity))
        .route("/api/cart/count", get(count_items))
        .route("/api/cart/items", get(list_items))
        .route("/api/cart/delete-multiple", delete(delete_items))
}

fn invalid_quantity() -> ApiError {
    ApiError::BadRequest("Invalid buy_quantity".to_string())
}

fn ensure_quantity(quantity: i64) -> Result<(), ApiError> {
    if quantity > 0 {
        Ok(())
    } else {
        Err(invalid_quantity())
    }
}

/// POST /api/cart/add
///
/// Adding a variant already in the cart grows that line instead of creating a
/// second one.
async fn add_to_cart(
    State(state): State<AppState>,
    caller: Authenticated,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Json<Envelope<Data<Value>>>, ApiError> {
    let Json(req) = payload?;
    ensure_quantity(req.buy_quantity)?;
    let db = &state.supabase;

    let existing = db
        .from(TABLE)
        .eq("user_id", caller.id())
        .eq("variant_id", &req.variant_id)
        .fetch_optional::<CartRow>()
        .await?;

    if let Some(line) = existing {
        let patch = cart::grown_quantity(&line, req.buy_quantity)
            .and_then(|quantity| cart::rescale(&line, quantity))
            .ok_or_else(invalid_quantity)?;
        let updated: Value = db
            .from(TABLE)
            .eq("id", &line.id)
            .update_single(&patch)
            .await?;
        return Ok(Json(
            Envelope::ok(Data { data: updated }).with_message("Cart item updated"),
        ));
    }

    let variant = db
        .from(VARIANTS_TABLE)
        .select(VARIANT_COLUMNS)
        .eq("id", &req.variant_id)
        .fetch_optional::<VariantRow>()
        .await?
        .ok_or_else(|| ApiError::NotFound("Variant not found".to_string()))?;

    let line = cart::new_line(caller.id(), &req, &variant).ok_or_else(invalid_quantity)?;
    let created: Value = db.from(TABLE).insert_single(&line).await?;

    Ok(Json(
        Envelope::ok(Data { data: created }).with_message("Item added to cart"),
    ))
}

/// PUT /api/cart/update/{id}
async fn update_quantity(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCartRequest>, JsonRejection>,
) -> Result<Json<Envelope<Data<Value>>>, ApiError> {
    let Json(req) = payload?;
    ensure_quantity(req.buy_quantity)?;
    let db = &state.supabase;

    let line = db
        .from(TABLE)
        .eq("id", &id)
        .eq("user_id", caller.id())
        .fetch_optional::<CartRow>()
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart item not found".to_string()))?;

    let patch = cart::rescale(&line, req.buy_quantity).ok_or_else(invalid_quantity)?;
    let updated: Value = db
        .from(TABLE)
        .eq("id", &id)
        .eq("user_id", caller.id())
        .update_single(&patch)
        .await?;

    Ok(Json(Envelope::ok(Data { data: updated })))
}

async fn count_items(
    State(state): State<AppState>,
    caller: Authenticated,
) -> Result<Json<Envelope<Count>>, ApiError> {
    let count = state
        .supabase
        .from(TABLE)
        .eq("user_id", caller.id())
        .count()
        .await?;
    Ok(Json(Envelope::ok(Count { count })))
}

async fn list_items(
    State(state): State<AppState>,
    caller: Authenticated,
) -> Result<Json<Envelope<Data<Vec<Value>>>>, ApiError> {
    let rows = state
        .supabase
        .from(TABLE)
        .select(ITEMS_WITH_PRODUCT)
        .eq("user_id", caller.id())
        .order("created_at", false)
        .fetch()
        .await?;
    Ok(Json(Envelope::ok(Data { data: rows })))
}

/// DELETE /api/cart/delete-multiple
///
/// Ids that belong to other users are silently skipped.
async fn delete_items(
    State(state): State<AppState>,
    caller: Authenticated,
    payload: Result<Json<DeleteCartItemsRequest>, JsonRejection>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    let Json(req) = payload?;

    state
        .supabase
        .from(TABLE)
        .in_("id", &req.item_ids)
        .eq("user_id", caller.id())
        .delete()
        .await?;

    Ok(Json(Envelope::done()))
}
