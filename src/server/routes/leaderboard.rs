use crate::error::ApiError;
use crate::server::router::AppState;
use crate::store::leaderboard;

use axum::{Json, Router, extract::State, routing::get};
use vectorshop_schema::{Data, Envelope, LeaderboardEntry};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/leaderboard", get(get_leaderboard))
}

async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Data<Vec<LeaderboardEntry>>>>, ApiError> {
    let entries = leaderboard::load(&state.supabase).await?;
    Ok(Json(Envelope::ok(Data { data: entries })))
}
