use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::{Method, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use celeste_shared::ChatMessage;
use celeste_store::{ChatSummary, Database};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::relay::Relay;

/// Largest request body accepted on any route (2 MiB).
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub db: Arc<Mutex<Database>>,
}

impl AppState {
    pub fn new(config: &ServerConfig, client: reqwest::Client, db: Arc<Mutex<Database>>) -> Self {
        Self {
            relay: Arc::new(Relay::new(client, config)),
            db,
        }
    }

    fn lock_db(&self) -> Result<MutexGuard<'_, Database>, ServerError> {
        self.db
            .lock()
            .map_err(|e| ServerError::Internal(format!("Database lock poisoned: {e}")))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/query", post(query))
        .route("/api/chats", get(list_chats).post(add_chat))
        .route(
            "/api/chats/{id}",
            get(get_chat).put(update_chat).delete(delete_chat),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct HistoryRequest {
    history: Vec<ChatMessage>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// Raw bytes rather than `Json<_>`: the relay owns the error messages for bad bodies.
async fn query(State(state): State<AppState>, body: Bytes) -> Result<Response, ServerError> {
    state.relay.forward(&body).await
}

// ─── Chat store endpoints ───

async fn list_chats(State(state): State<AppState>) -> Result<Json<Vec<ChatSummary>>, ServerError> {
    let chats = state.lock_db()?.list_chats()?;
    Ok(Json(chats))
}

async fn add_chat(
    State(state): State<AppState>,
    payload: Result<Json<HistoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatSummary>), ServerError> {
    let Json(req) = payload?;
    let summary = state.lock_db()?.add_chat(&req.history)?;
    info!(id = summary.id, "Chat created");
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ChatMessage>>, ServerError> {
    let history = state
        .lock_db()?
        .get_chat_history(id)
        .map_err(ServerError::for_chat(id))?;
    Ok(Json(history))
}

async fn update_chat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<HistoryRequest>, JsonRejection>,
) -> Result<StatusCode, ServerError> {
    let Json(req) = payload?;
    state
        .lock_db()?
        .update_chat(id, &req.history)
        .map_err(ServerError::for_chat(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    if state.lock_db()?.delete_chat(id)? {
        info!(id, "Chat deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
