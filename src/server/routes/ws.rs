//! `/ws`: per-user push channel fed by the relay.

use crate::error::ApiError;
use crate::server::guards::auth::resolve_user;
use crate::server::router::AppState;
use crate::supabase::AuthUser;

use axum::{
    Router,
    body::Bytes,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
    routing::get,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events buffered per socket before the relay starts dropping them.
const OUTBOX_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
struct ConnectParams {
    token: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

async fn upgrade(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| serve(socket, state, params.token))
}

/// Resolves the handshake token. The error is the close reason sent back.
async fn authenticate(state: &AppState, token: Option<&str>) -> Result<AuthUser, &'static str> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or("Authorization Required")?;
    match resolve_user(&state.supabase, token).await {
        Ok(user) => Ok(user),
        Err(ApiError::Unauthorized(message)) => {
            debug!(reason = %message, "WebSocket token rejected");
            Err("Invalid Token")
        }
        Err(err) => {
            warn!(error = %err, "WebSocket authentication failed");
            Err("Authentication Failed")
        }
    }
}

async fn close_with(mut socket: WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    if let Err(err) = socket.send(Message::Close(Some(frame))).await {
        debug!(error = %err, "Close frame not delivered");
    }
}

async fn serve(mut socket: WebSocket, state: AppState, token: Option<String>) {
    let user = match authenticate(&state, token.as_deref()).await {
        Ok(user) => user,
        Err(reason) => {
            close_with(socket, close_code::POLICY, reason).await;
            return;
        }
    };

    let (tx, mut outbox) = mpsc::channel(OUTBOX_CAPACITY);
    let conn = match state.relay.attach(user.id.clone(), tx).await {
        Ok(conn) => conn,
        Err(err) => {
            warn!(user_id = %user.id, error = %err, "Relay refused connection");
            close_with(socket, close_code::ERROR, "Relay Unavailable").await;
            return;
        }
    };
    info!(%conn, user_id = %user.id, "WebSocket connected");

    let mut ping = tokio::time::interval(state.ws_ping_interval());
    // The first tick completes immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                // Pongs to client pings are queued by the protocol layer.
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%conn, error = %err, "WebSocket read failed");
                    break;
                }
            },
            event = outbox.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(%conn, error = %err, "Event not serializable"),
                }
            }
            _ = ping.tick() => {
                if socket.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.relay.detach(conn);
    info!(%conn, user_id = %user.id, "WebSocket disconnected");
}
