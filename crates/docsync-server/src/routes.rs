//! HTTP surface of the ingestion server.
//!
//! Batch-level problems map to status codes; per-item problems are always a
//! `200` with rejected item results.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use docsync_core::config::ServerConfig;
use docsync_core::errors::error_code::{self, DocSyncErrorCode};
use docsync_core::errors::IngestError;
use docsync_core::models::{
    ErrorResponse, SyncRequest, PROTOCOL_HEADER, PROTOCOL_VERSION, SYNC_BATCHES_PATH,
};

use crate::pipeline::IngestionPipeline;
use crate::registry::ScopeRegistry;

pub const HEALTH_PATH: &str = "/api/v1/health";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<IngestionPipeline>,
    registry: Arc<ScopeRegistry>,
    in_flight: Arc<Semaphore>,
    max_items: usize,
    busy_retry_after_secs: u64,
}

impl AppState {
    pub fn new(pipeline: IngestionPipeline, registry: ScopeRegistry, config: &ServerConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            registry: Arc::new(registry),
            in_flight: Arc::new(Semaphore::new(config.max_in_flight_batches)),
            max_items: config.max_items_per_batch,
            busy_retry_after_secs: config.busy_retry_after_secs,
        }
    }

    pub fn pipeline(&self) -> &Arc<IngestionPipeline> {
        &self.pipeline
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(SYNC_BATCHES_PATH, post(ingest_batch))
        .route(HEALTH_PATH, get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            error: message.into(),
        }),
    )
        .into_response()
}

fn ingest_error(err: IngestError) -> Response {
    let status = match err {
        IngestError::InvalidBatch { .. } => StatusCode::BAD_REQUEST,
        IngestError::UnknownScope { .. } => StatusCode::NOT_FOUND,
        IngestError::Unauthorized => StatusCode::UNAUTHORIZED,
    };
    error_response(status, err.error_code(), err.to_string())
}

fn invalid_batch(reason: impl Into<String>) -> Response {
    ingest_error(IngestError::InvalidBatch {
        reason: reason.into(),
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Same major version, or no header at all.
fn protocol_supported(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(PROTOCOL_HEADER) else {
        return true;
    };
    let major = |v: &str| v.split('.').next().map(str::to_string);
    value
        .to_str()
        .ok()
        .is_some_and(|v| major(v) == major(PROTOCOL_VERSION))
}

async fn ingest_batch(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return ingest_error(IngestError::Unauthorized);
    };
    if !state.registry.recognizes(token) {
        tracing::warn!("batch with unrecognized credential");
        return ingest_error(IngestError::Unauthorized);
    }
    if !protocol_supported(&headers) {
        return invalid_batch(format!("unsupported protocol version, expected {PROTOCOL_VERSION}"));
    }

    let request: SyncRequest<Value> = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return invalid_batch(e.to_string()),
    };
    if request.source_scope_id.trim().is_empty() {
        return invalid_batch("sourceScopeId must not be empty");
    }
    if request.items.is_empty() {
        return invalid_batch("items must not be empty");
    }
    if request.items.len() > state.max_items {
        return invalid_batch(format!(
            "{} items exceeds the limit of {}",
            request.items.len(),
            state.max_items
        ));
    }
    if let Err(e) = state.registry.authorize(&request.source_scope_id, token) {
        tracing::warn!(scope = %request.source_scope_id, error = %e, "batch refused");
        return ingest_error(e);
    }

    let Ok(permit) = Arc::clone(&state.in_flight).try_acquire_owned() else {
        tracing::warn!(scope = %request.source_scope_id, "too many batches in flight");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, state.busy_retry_after_secs.to_string())],
            Json(ErrorResponse {
                code: error_code::RATE_LIMITED.to_string(),
                error: "too many batches in flight".to_string(),
            }),
        )
            .into_response();
    };

    let received_at = Utc::now();
    let pipeline = Arc::clone(&state.pipeline);
    let scope_id = request.source_scope_id;
    let items = request.items;
    tracing::debug!(scope = %scope_id, agent = %request.agent_id, items = items.len(), "batch received");

    let joined = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        pipeline.ingest(&scope_id, items, received_at)
    })
    .await;

    match joined {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "batch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.error_code(), e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "ingestion task failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                error_code::STORAGE_ERROR,
                "ingestion task failed",
            )
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "protocolVersion": PROTOCOL_VERSION }))
}
