//! WebSocket server + REST endpoints for the interview.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::Authenticator;
use crate::catalog::Catalog;
use crate::interview::handler::{ChannelClosed, HandlerOutcome, SessionProtocolHandler, Transport};
use crate::interview::model::SessionStatus;
use crate::interview::protocol::ServerFrame;
use crate::recommend::RecommendationProvider;
use crate::store::SessionStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub store: Arc<dyn SessionStore>,
    pub authenticator: Arc<dyn Authenticator>,
    /// None disables recommendations; completion skips straight to the
    /// finished frame.
    pub recommender: Option<Arc<dyn RecommendationProvider>>,
}

/// Build the Axum router with the interview WebSocket and REST routes.
pub fn interview_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/sessions", post(start_session))
        .route("/api/sessions/{id}/messages", get(list_session_messages))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "career-intake"
    }))
}

// ── WebSocket ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WsQuery {
    token: String,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("Interview client connecting");
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.token))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, token: String) {
    let Some(user_id) = state.authenticator.authenticate(&token) else {
        warn!("WebSocket auth failed, closing");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: "authentication failed".into(),
            })))
            .await;
        return;
    };
    info!(user_id = %user_id, "Interview client connected");

    let handler = SessionProtocolHandler::new(
        Arc::clone(&state.catalog),
        Arc::clone(&state.store),
        state.recommender.clone(),
    );
    let mut transport = WsTransport { socket };

    match handler.run(user_id, &mut transport).await {
        Ok(HandlerOutcome::Completed) => {
            info!(user_id = %user_id, "Interview completed");
            let _ = transport
                .socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::NORMAL,
                    reason: "finished".into(),
                })))
                .await;
        }
        Ok(HandlerOutcome::Disconnected) => {
            // Progress is persisted; the client reconnects and resumes.
            info!(user_id = %user_id, "Interview client disconnected");
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Interview handler failed");
            let _ = transport
                .socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::ERROR,
                    reason: "internal error".into(),
                })))
                .await;
        }
    }
}

/// `Transport` over an Axum WebSocket. Pings are answered inline;
/// anything that is not a text frame is skipped.
struct WsTransport {
    socket: WebSocket,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: &ServerFrame) -> Result<(), ChannelClosed> {
        let json = serde_json::to_string(frame).map_err(|_| ChannelClosed)?;
        self.socket
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| ChannelClosed)
    }

    async fn recv(&mut self) -> Option<String> {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(Message::Ping(data))) => {
                    if self.socket.send(Message::Pong(data)).await.is_err() {
                        return None;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket error");
                    return None;
                }
                _ => {}
            }
        }
    }
}

// ── REST Endpoints ──────────────────────────────────────────────────
//
// Thin wrappers over a subset of the state-machine operations, for
// clients that poll over plain HTTP.

/// Extract and verify the bearer token from the Authorization header.
fn bearer_user(headers: &HeaderMap, authenticator: &dyn Authenticator) -> Option<Uuid> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    authenticator.authenticate(token)
}

async fn start_session(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(user_id) = bearer_user(&headers, state.authenticator.as_ref()) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "invalid token"})),
        );
    };

    let total = state.catalog.total() as u32;
    let session = match state.store.get_latest_session(user_id).await {
        Ok(Some(session))
            if session.status == SessionStatus::Active && session.answers_count < total =>
        {
            session
        }
        Ok(_) => match state.store.create_session(user_id).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Session creation failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "internal error"})),
                );
            }
        },
        Err(e) => {
            error!(error = %e, "Session lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal error"})),
            );
        }
    };

    let next_prompt = state
        .catalog
        .by_global_index(session.answers_count as usize)
        .map(|q| q.prompt.clone());

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "session_id": session.id,
            "created_at": session.created_at,
            "question": next_prompt,
        })),
    )
}

async fn list_session_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(user_id) = bearer_user(&headers, state.authenticator.as_ref()) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "invalid token"})),
        );
    };

    let session_id = match Uuid::parse_str(&id) {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "invalid session id"})),
            );
        }
    };

    // Sessions are only visible to their owner.
    match state.store.get_session(session_id).await {
        Ok(Some(session)) if session.user_id == user_id => {}
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "session not found"})),
            );
        }
        Err(e) => {
            error!(error = %e, "Session lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal error"})),
            );
        }
    }

    match state.store.list_messages(session_id).await {
        Ok(messages) => (StatusCode::OK, Json(serde_json::json!(messages))),
        Err(e) => {
            error!(error = %e, "Message listing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal error"})),
            )
        }
    }
}
