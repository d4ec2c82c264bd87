//! HTTP API for the support agent.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/chat` | Process a customer message (`{message, session_id?}`) |
//! | `POST` | `/api/reset/{session_id}` | Clear a session's history and cached persona |
//! | `GET`  | `/api/metrics` | Aggregate metrics summary |
//! | `GET`  | `/api/health` | Health check |
//! | `POST` | `/api/search` | Search the knowledge base directly |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "No message provided" } }
//! ```
//!
//! Error code: `bad_request` (400). A search that matches nothing answers
//! 200 with an empty `results` list.
//!
//! A failing LLM call is not an HTTP error: `/api/chat` still answers 200
//! with an escalated response whose `error` field is set.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted for browser-based chat
//! widgets.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::agent::{ChatResponse, SupportAgent};
use crate::config::Config;
use crate::search::{search, SearchHit, SearchRequest};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    agent: Arc<SupportAgent>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(agent: Arc<SupportAgent>, config: Arc<Config>) -> Self {
        Self { agent, config }
    }
}

/// Build the API router with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/reset/{session_id}", post(handle_reset))
        .route("/api/metrics", get(handle_metrics))
        .route("/api/health", get(handle_health))
        .route("/api/search", post(handle_search))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`.
///
/// Builds the catalog index and the configured responder first, so
/// configuration problems surface before the port is bound.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let agent = Arc::new(SupportAgent::from_config(config)?);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        bind = %config.server.bind,
        responder = agent.responder_name(),
        "server listening"
    );
    println!("Support agent listening on http://{}", config.server.bind);

    let state = AppState::new(agent, Arc::new(config.clone()));
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = body?;
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| bad_request("No message provided"))?;
    let session_id = req.session_id.unwrap_or_else(|| "default".to_string());

    Ok(Json(state.agent.process_message(&session_id, &message).await))
}

// ============ POST /api/reset/{session_id} ============

async fn handle_reset(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    state.agent.reset(&session_id);
    Json(serde_json::json!({ "message": "Conversation reset successfully" }))
}

// ============ GET /api/metrics ============

async fn handle_metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.agent.metrics_summary() {
        Some(summary) => Json(serde_json::to_value(summary).unwrap_or_default()),
        None => Json(serde_json::json!({ "message": "No requests yet" })),
    }
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    llm_configured: bool,
    active_sessions: usize,
    total_requests: u64,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        llm_configured: state.config.llm.is_enabled(),
        active_sessions: state.agent.active_sessions(),
        total_requests: state.agent.total_requests(),
    })
}

// ============ POST /api/search ============

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

async fn handle_search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(req) = body?;
    let retriever = state.agent.retriever();
    let results = search(retriever, state.config.retrieval.top_k, &req);
    Ok(Json(SearchResponse { results }))
}
