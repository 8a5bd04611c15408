use crate::error::ApiError;
use crate::server::guards::auth::Authenticated;
use crate::server::router::AppState;
use crate::store::leaderboard::USERS_TABLE;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use vectorshop_schema::{Data, Envelope, LoginRequest, SignupRequest, Token};

const INITIAL_RANK: &str = "BRONZE";
const SETUP_HINT: &str = "Make sure 'users' table exists in Supabase";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/test", get(connection_test))
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
        .route("/api/user/me", get(me))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/test
///
/// Reads one `users` row to prove the backend is reachable and provisioned.
async fn connection_test(State(state): State<AppState>) -> Response {
    match state
        .supabase
        .from(USERS_TABLE)
        .limit(1)
        .fetch_single::<Value>()
        .await
    {
        Ok(row) => Json(Envelope::ok(Data { data: row }).with_message("Connection successful"))
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Backend connection test failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": err.to_string(),
                    "hint": SETUP_HINT,
                })),
            )
                .into_response()
        }
    }
}

#[derive(Serialize)]
struct NewUserRow<'a> {
    id: &'a str,
    email: &'a str,
    full_name: &'a str,
    gender: &'a Value,
    birth_date: &'a Value,
    points: i64,
    exp: i64,
    rank: &'static str,
}

/// POST /api/signup
///
/// Creates the auth account, then its `users` profile row.
async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<Envelope<Token>>, ApiError> {
    let Json(req) = payload?;

    let outcome = state
        .supabase
        .auth()
        .sign_up(&req.email, &req.password, &req.display_name)
        .await?;

    let profile = NewUserRow {
        id: &outcome.user.id,
        email: &req.email,
        full_name: &req.display_name,
        gender: &req.gender,
        birth_date: &req.birth_date,
        points: 0,
        exp: 0,
        rank: INITIAL_RANK,
    };
    state
        .supabase
        .from(USERS_TABLE)
        .insert::<_, Value>(&[profile])
        .await?;

    if outcome.session.is_none() {
        tracing::info!(user_id = %outcome.user.id, "Signup awaiting email confirmation");
    }

    Ok(Json(
        Envelope::ok(Token {
            token: outcome.session.map(|s| s.access_token),
        })
        .with_message("Sign up successful"),
    ))
}

/// POST /api/login
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Envelope<Token>>, ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::InvalidCredentials)?;

    let session = state
        .supabase
        .auth()
        .sign_in_with_password(&req.email, &req.password)
        .await
        .map_err(|err| {
            tracing::debug!(error = %err, "Login refused");
            ApiError::InvalidCredentials
        })?;

    Ok(Json(
        Envelope::ok(Token {
            token: Some(session.access_token),
        })
        .with_message("Login successful"),
    ))
}

/// GET /api/user/me
///
/// Any failure, including a missing profile row, is reported as 401.
async fn me(
    State(state): State<AppState>,
    caller: Result<Authenticated, ApiError>,
) -> Result<Json<Envelope<Data<Value>>>, ApiError> {
    let caller = caller.map_err(ApiError::into_unauthorized)?;

    let profile = state
        .supabase
        .from(USERS_TABLE)
        .eq("id", caller.id())
        .fetch_single::<Value>()
        .await
        .map_err(|err| ApiError::from(err).into_unauthorized())?;

    Ok(Json(Envelope::ok(Data { data: profile })))
}
