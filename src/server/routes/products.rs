use crate::error::ApiError;
use crate::server::router::AppState;
use crate::store::products::{self, TABLE, VARIANTS_TABLE};

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde_json::Value;
use vectorshop_schema::{Data, Envelope};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/products/{id}/variants", get(list_variants))
}

async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Data<Vec<Value>>>>, ApiError> {
    let rows = state
        .supabase
        .from(TABLE)
        .order("created_at", false)
        .fetch()
        .await?;
    Ok(Json(Envelope::ok(Data { data: rows })))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Data<Value>>>, ApiError> {
    if !products::is_product_id(&id) {
        return Err(ApiError::BadRequest("Invalid product ID format".to_string()));
    }

    let product = state
        .supabase
        .from(TABLE)
        .eq("id", &id)
        .fetch_optional::<Value>()
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok(Json(Envelope::ok(Data { data: product })))
}

/// Variants of one product by `variant_type`. Any backend failure reads as "not found".
async fn list_variants(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Data<Vec<Value>>>>, ApiError> {
    let rows = state
        .supabase
        .from(VARIANTS_TABLE)
        .eq("product_id", &id)
        .order("variant_type", true)
        .fetch()
        .await
        .map_err(|err| {
            tracing::warn!(product_id = %id, error = %err, "Variant lookup failed");
            ApiError::NotFound("Variants not found".to_string())
        })?;
    Ok(Json(Envelope::ok(Data { data: rows })))
}
