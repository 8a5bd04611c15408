use crate::error::ApiError;
use crate::server::router::AppState;
use crate::store::catalog::{
    self, BANNERS_TABLE, CategoryRow, PAYMENT_METHODS_TABLE, SERVICE_COLUMNS, SERVICES_TABLE,
};

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use serde_json::Value;
use vectorshop_schema::{Data, Envelope};

#[derive(Debug, Serialize)]
pub struct Categories {
    pub categories: Vec<Value>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/payment-methods", get(list_payment_methods))
        .route("/api/services/categories", get(list_service_categories))
        .route("/api/services", get(list_services))
        .route("/api/banners", get(list_banners))
}

async fn newest_first(
    state: &AppState,
    table: &str,
    columns: Option<&str>,
) -> Result<Json<Envelope<Data<Vec<Value>>>>, ApiError> {
    let mut query = state.supabase.from(table);
    if let Some(columns) = columns {
        query = query.select(columns);
    }
    let rows = query.order("created_at", false).fetch().await?;
    Ok(Json(Envelope::ok(Data { data: rows })))
}

async fn list_payment_methods(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Data<Vec<Value>>>>, ApiError> {
    newest_first(&state, PAYMENT_METHODS_TABLE, None).await
}

async fn list_service_categories(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Categories>>, ApiError> {
    let rows: Vec<CategoryRow> = state
        .supabase
        .from(SERVICES_TABLE)
        .select("category")
        .not_null("category")
        .order("category", true)
        .fetch()
        .await?;
    Ok(Json(Envelope::ok(Categories {
        categories: catalog::distinct_categories(rows),
    })))
}

async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Data<Vec<Value>>>>, ApiError> {
    newest_first(&state, SERVICES_TABLE, Some(SERVICE_COLUMNS)).await
}

async fn list_banners(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Data<Vec<Value>>>>, ApiError> {
    newest_first(&state, BANNERS_TABLE, None).await
}
