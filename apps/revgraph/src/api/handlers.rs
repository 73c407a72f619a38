//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ApplyRequest, ApplyResponse, ExportResponse, FetchRequest, FetchResponse, HealthResponse,
        RegistryResponse, StatusResponse, status_for,
    },
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use revgraph_core::batch_to_bytes;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get store status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    match session.records() {
        Ok(records) => Ok((
            StatusCode::OK,
            Json(StatusResponse::from_records(
                &records,
                session.is_persistent(),
            )),
        )),
        Err(e) => {
            tracing::error!("Status failed: {}", e);
            Err((status_for(&e), format!("Status failed: {}", e)))
        }
    }
}

// =============================================================================
// FETCH HANDLER
// =============================================================================

/// Project the walk from a root entity.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> impl IntoResponse {
    let depth = match request.checked_depth(state.max_depth) {
        Ok(depth) => depth,
        Err(msg) => return (StatusCode::BAD_REQUEST, Json(FetchResponse::error(msg))),
    };

    let session = state.session.read().await;
    match session.fetch(request.root, depth) {
        Ok(records) => {
            tracing::debug!(root = %request.root, depth, records = records.len(), "fetched scope");
            (
                StatusCode::OK,
                Json(FetchResponse::success(request.root, depth, records)),
            )
        }
        Err(e) => (
            status_for(&e),
            Json(FetchResponse::error(format!("Fetch failed: {}", e))),
        ),
    }
}

// =============================================================================
// APPLY HANDLER
// =============================================================================

/// Resolve a record batch and merge it into the store.
pub async fn apply_handler(
    State(state): State<AppState>,
    Json(request): Json<ApplyRequest>,
) -> impl IntoResponse {
    let mut session = state.session.write().await;
    match session.apply(&request.records) {
        Ok(report) => (
            StatusCode::OK,
            Json(ApplyResponse::success(report.resolved, report.changed)),
        ),
        Err(e) => {
            tracing::warn!("Apply rejected: {}", e);
            (
                status_for(&e),
                Json(ApplyResponse::error(format!("Apply failed: {}", e))),
            )
        }
    }
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export every stored record as a base64 binary batch.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;

    let records = match session.records() {
        Ok(records) => records,
        Err(e) => {
            return (
                status_for(&e),
                Json(ExportResponse::error(format!("Failed to read records: {}", e))),
            );
        }
    };

    match batch_to_bytes(&records) {
        Ok(data) => (
            StatusCode::OK,
            Json(ExportResponse::success(&data, records.len())),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ExportResponse::error(format!("Export failed: {}", e))),
        ),
    }
}

// =============================================================================
// REGISTRY HANDLER
// =============================================================================

/// The relation declaration table the server walks with.
pub async fn registry_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    Json(RegistryResponse::from_registry(session.registry()))
}
