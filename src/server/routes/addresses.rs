use crate::error::ApiError;
use crate::server::guards::auth::Authenticated;
use crate::server::router::AppState;
use crate::store::{ADDRESS_UNUSED, ADDRESS_USED, ADDRESSES_TABLE};
use crate::supabase::SupabaseClient;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, put},
};
use serde::Serialize;
use serde_json::{Value, json};
use vectorshop_schema::{Empty, Envelope, NewAddressRequest};

#[derive(Debug, Serialize)]
pub struct AddressList {
    pub addresses: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct SavedAddress {
    pub address: Value,
}

#[derive(Serialize)]
struct NewAddressRow<'a> {
    user_id: &'a str,
    alamat_lengkap: &'a Value,
    patokan: &'a Value,
    jenis_alamat: &'a Value,
    status: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/addresses", get(list_addresses).post(add_address))
        .route("/api/addresses/{id}/select", put(select_address))
}

/// Exactly one address per user is `USED`; everything else is reset first.
async fn clear_selection(db: &SupabaseClient, user_id: &str) -> Result<(), ApiError> {
    db.from(ADDRESSES_TABLE)
        .eq("user_id", user_id)
        .update_silent(&json!({ "status": ADDRESS_UNUSED }))
        .await?;
    Ok(())
}

async fn list_addresses(
    State(state): State<AppState>,
    caller: Authenticated,
) -> Result<Json<Envelope<AddressList>>, ApiError> {
    let addresses = state
        .supabase
        .from(ADDRESSES_TABLE)
        .eq("user_id", caller.id())
        .order("created_at", false)
        .fetch()
        .await?;
    Ok(Json(Envelope::ok(AddressList { addresses })))
}

/// POST /api/addresses
///
/// The new address becomes the selected one.
async fn add_address(
    State(state): State<AppState>,
    caller: Authenticated,
    payload: Result<Json<NewAddressRequest>, JsonRejection>,
) -> Result<Json<Envelope<SavedAddress>>, ApiError> {
    let Json(req) = payload?;
    clear_selection(&state.supabase, caller.id()).await?;

    let row = NewAddressRow {
        user_id: caller.id(),
        alamat_lengkap: &req.alamat_lengkap,
        patokan: &req.patokan,
        jenis_alamat: &req.jenis_alamat,
        status: ADDRESS_USED,
    };
    let address = state
        .supabase
        .from(ADDRESSES_TABLE)
        .insert_single(&row)
        .await?;

    Ok(Json(Envelope::ok(SavedAddress { address })))
}

async fn select_address(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    clear_selection(&state.supabase, caller.id()).await?;

    state
        .supabase
        .from(ADDRESSES_TABLE)
        .eq("id", &id)
        .eq("user_id", caller.id())
        .update_silent(&json!({ "status": ADDRESS_USED }))
        .await?;

    Ok(Json(Envelope::done()))
}
