//! # revgraph HTTP API Module
//!
//! This module implements the HTTP REST API server using axum. It is the
//! transport collaborator: it decides the walk depth per request and carries
//! transfer records as JSON.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Entity counts
//! - `POST /fetch` - Depth-scoped projection from a root entity
//! - `POST /apply` - Resolve a record batch and merge it into the store
//! - `POST /export` - Every stored record as a base64 binary batch
//! - `GET /registry` - Relation declaration table
//!
//! ## Security Configuration
//!
//! - `cors_origins` / `REVGRAPH_CORS_ORIGINS`: Comma-separated list of allowed
//!   origins, or "*" for all (default: localhost only)
//! - `rate_limit` / `REVGRAPH_RATE_LIMIT`: Requests per second (default: 100,
//!   0 to disable)

mod handlers;
mod middleware;
mod types;

pub use handlers::{
    apply_handler, export_handler, fetch_handler, health_handler, registry_handler,
    status_handler,
};
pub use middleware::create_rate_limiter;
pub use types::{
    ApplyRequest, ApplyResponse, CategoryJson, ExportResponse, FetchRequest, FetchResponse,
    HealthResponse, RegistryResponse, RelationJson, StatusResponse, TypeJson, status_for,
};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use revgraph_core::{Depth, RevgraphError, Session};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the session.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    /// Deepest walk a request may ask for.
    pub max_depth: Depth,
}

impl AppState {
    /// Create app state with the default depth limit.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self::with_max_depth(session, ServerConfig::default().max_depth)
    }

    #[must_use]
    pub fn with_max_depth(session: Session, max_depth: Depth) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            max_depth,
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from the configured origins.
///
/// - `Some("*")`: allows all origins
/// - `None`: localhost only
/// - otherwise: the comma-separated list; invalid entries are skipped
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/fetch", post(handlers::fetch_handler))
        .route("/apply", post(handlers::apply_handler))
        .route("/export", post(handlers::export_handler))
        .route("/registry", get(handlers::registry_handler));

    if config.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(config.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(config.body_limit))
        .layer(build_cors_layer(config.cors_origins.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(config: &ServerConfig, session: Session) -> Result<(), RevgraphError> {
    let state = AppState::with_max_depth(session, config.max_depth);
    let router = create_router(state, config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RevgraphError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("revgraph HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RevgraphError::IoError(format!("Server error: {}", e)))
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
