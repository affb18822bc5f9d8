//! Route handlers: the public endpoints and their JSON shapes.
//!
//! Error mapping: validation failures become 400s with an error field;
//! any upstream failure becomes a 500 carrying the configured fallback
//! reply and no internal detail.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use anya_gateway::{GatewayError, Orchestrator, SessionStore};

use crate::cors;

const DEFAULT_USER_ID: &str = "default_user";

/// Shared handler state, constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<SessionStore>,
    pub debug_mode: bool,
    pub fallback_reply: String,
    pub cors_origins: Arc<Vec<String>>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health))
        .route("/api/reset", post(reset))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            cors::allowlist,
        ));

    Router::new().route("/", get(home)).merge(api).with_state(state)
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

#[derive(Deserialize)]
struct ChatRequest {
    message: Option<String>,
    #[serde(default = "default_user_id")]
    user_id: String,
}

#[derive(Deserialize)]
struct ResetRequest {
    #[serde(default = "default_user_id")]
    user_id: String,
}

async fn home() -> Html<&'static str> {
    Html(
        "<h1>Anya chat server is running</h1>\
         <p>The chat API lives at <code>/api/chat</code>.</p>",
    )
}

async fn chat(State(state): State<AppState>, body: Option<Json<ChatRequest>>) -> Response {
    let Some(Json(request)) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "request body must be JSON"})),
        )
            .into_response();
    };
    let message = request.message.unwrap_or_default();

    if state.debug_mode {
        info!(user_id = %request.user_id, ">>> {message}");
    }

    match state.orchestrator.handle(&request.user_id, &message).await {
        Ok(reply) => {
            if state.debug_mode {
                info!(user_id = %request.user_id, "<<< {reply}");
            }
            Json(json!({"reply": reply, "user_id": request.user_id})).into_response()
        }
        Err(GatewayError::Validation(msg)) => {
            (StatusCode::BAD_REQUEST, Json(json!({"error": msg}))).into_response()
        }
        Err(e) => {
            warn!(user_id = %request.user_id, error = %e, "chat request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal server error",
                    "reply": state.fallback_reply,
                    "user_id": request.user_id,
                })),
            )
                .into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> Response {
    let status = state.orchestrator.health().await;
    if status.healthy {
        Json(json!({
            "status": "healthy",
            "server": "running",
            "gigachat": "connected",
            "test_response": status.detail,
        }))
        .into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "unhealthy",
                "server": "running",
                "gigachat": "disconnected",
                "error": status.detail,
            })),
        )
            .into_response()
    }
}

async fn reset(State(state): State<AppState>, body: Option<Json<ResetRequest>>) -> Response {
    let user_id = body
        .map(|Json(request)| request.user_id)
        .unwrap_or_else(default_user_id);

    let existed = state.orchestrator.reset(&user_id).await;
    if existed && state.debug_mode {
        info!(user_id = %user_id, "history reset via API");
    }

    Json(json!({
        "status": "success",
        "message": "conversation history reset",
        "user_id": user_id,
    }))
    .into_response()
}
