//! JSON HTTP API over the retriever and the response cache.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/context` | Formatted context block for a query |
//! | `POST` | `/search` | Scored chunks for a query |
//! | `POST` | `/cache/lookup` | Cached answer for a question, or `null` |
//! | `POST` | `/cache/store` | Cache a question → answer pair |
//! | `GET`  | `/stats` | Index and cache statistics |
//! | `POST` | `/refresh` | Rebuild the index (`{"force": true}` ignores the TTL) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use assist_harness_core::cache::{CacheStats, ResponseCache};
use assist_harness_core::index::SearchHit;

use crate::config::Config;
use crate::models::DocumentMetadata;
use crate::retriever::{Retriever, RetrieverStats};
use crate::traits::ConnectorRegistry;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub retriever: Arc<Retriever>,
    pub cache: Arc<Mutex<ResponseCache>>,
}

impl AppState {
    pub fn from_config(config: &Config, connectors: ConnectorRegistry) -> anyhow::Result<Self> {
        Ok(Self {
            retriever: Arc::new(Retriever::from_config(config, connectors)?),
            cache: Arc::new(Mutex::new(ResponseCache::new(config.cache.to_core())?)),
        })
    }

    fn cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build the router without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/context", post(handle_context))
        .route("/search", post(handle_search))
        .route("/cache/lookup", post(handle_cache_lookup))
        .route("/cache/store", post(handle_cache_store))
        .route("/stats", get(handle_stats))
        .route("/refresh", post(handle_refresh))
        .layer(cors)
        .with_state(state)
}

/// Serve on `[server].bind` until the process is terminated.
pub async fn run_server(config: &Config, connectors: ConnectorRegistry) -> anyhow::Result<()> {
    let state = AppState::from_config(config, connectors)?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    serve(listener, state).await
}

/// Serve on an already-bound listener.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "assist server listening");
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
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(bad_request(format!("{} must not be empty", field)));
    }
    Ok(())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /context, POST /search ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct ContextResponse {
    context: String,
}

async fn handle_context(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<ContextResponse>, AppError> {
    require_non_empty("query", &req.query)?;
    let context = state.retriever.retrieve_context(&req.query, req.top_k).await;
    Ok(Json(ContextResponse { context }))
}

#[derive(Serialize)]
struct SearchResultItem {
    score: u32,
    content: String,
    metadata: DocumentMetadata,
}

impl From<SearchHit> for SearchResultItem {
    fn from(hit: SearchHit) -> Self {
        Self {
            score: hit.score,
            content: hit.chunk.content,
            metadata: hit.chunk.metadata,
        }
    }
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResultItem>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    require_non_empty("query", &req.query)?;
    state.retriever.refresh(false).await;
    let top_k = req.top_k.unwrap_or(state.retriever.top_k());
    let results = state
        .retriever
        .search(&req.query, top_k)
        .into_iter()
        .map(SearchResultItem::from)
        .collect();
    Ok(Json(SearchResponse { results }))
}

// ============ POST /cache/lookup, POST /cache/store ============

#[derive(Deserialize)]
struct LookupRequest {
    question: String,
}

#[derive(Serialize)]
struct LookupResponse {
    answer: Option<String>,
}

async fn handle_cache_lookup(
    State(state): State<AppState>,
    Json(req): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, AppError> {
    require_non_empty("question", &req.question)?;
    let answer = state.cache().get(&req.question);
    Ok(Json(LookupResponse { answer }))
}

#[derive(Deserialize)]
struct StoreRequest {
    question: String,
    answer: String,
}

#[derive(Serialize)]
struct StoreResponse {
    stored: bool,
}

async fn handle_cache_store(
    State(state): State<AppState>,
    Json(req): Json<StoreRequest>,
) -> Result<Json<StoreResponse>, AppError> {
    require_non_empty("question", &req.question)?;
    let stored = state.cache().put(&req.question, &req.answer);
    Ok(Json(StoreResponse { stored }))
}

// ============ GET /stats, POST /refresh ============

#[derive(Serialize)]
struct StatsResponse {
    index: RetrieverStats,
    cache: CacheStats,
}

async fn handle_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache().stats();
    Json(StatsResponse {
        index: state.retriever.stats(),
        cache,
    })
}

#[derive(Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    force: bool,
}

/// `POST /refresh`. The body is optional; without one the refresh is not
/// forced.
async fn handle_refresh(
    State(state): State<AppState>,
    req: Option<Json<RefreshRequest>>,
) -> Json<RetrieverStats> {
    let force = req.map(|Json(req)| req.force).unwrap_or(false);
    Json(state.retriever.refresh(force).await)
}
