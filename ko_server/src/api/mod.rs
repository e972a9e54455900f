//! HTTP/WebSocket API for the bracket server.
//!
//! This module provides the REST and WebSocket API for running single-elimination
//! tournaments. It handles bracket seeding, match resolution, standings queries,
//! and real-time notification delivery.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP/WebSocket
//! - **Tower**: Middleware for CORS and request correlation
//! - **Actor Headers**: Caller identity carried in `x-actor-id`/`x-actor-admin`
//! - **Notification Hub**: Per-entrant channels bridging bracket events to sockets
//!
//! # Modules
//!
//! - [`auth`]: Caller identity extraction from request headers
//! - [`brackets`]: Bracket seeding, match resolution, and standings endpoints
//! - [`websocket`]: Real-time notification delivery for entrants
//! - [`request_id`]: Request correlation IDs for log tracing
//!
//! # Endpoints Overview
//!
//! ## Brackets
//! - `POST /api/v1/events/{event_id}/bracket` - Seed and release a bracket (owner or admin)
//! - `GET /api/v1/events/{event_id}/bracket` - View bracket matches (public)
//! - `POST /api/v1/matches/{match_id}/winner` - Declare a match winner (owner or admin)
//!
//! ## WebSocket
//! - `GET /ws/{entrant_ref}` - Subscribe to an entrant's notifications
//!
//! ## Health Check
//! - `GET /health` - Server health status
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ko_server::api::{AppState, create_router};
//! use ko_server::hub::NotificationHub;
//! use knockout::db::{BracketStore, MemBracketStore};
//! use knockout::{BracketSeeder, MatchResolver, NotificationGateway, StandingQuery};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store: Arc<dyn BracketStore> = Arc::new(MemBracketStore::new());
//! let hub = Arc::new(NotificationHub::new());
//! let gateway: Arc<dyn NotificationGateway> = hub.clone();
//!
//! let state = AppState {
//!     seeder: BracketSeeder::new(Arc::clone(&store), Arc::clone(&gateway)),
//!     resolver: MatchResolver::new(Arc::clone(&store), gateway),
//!     standing: StandingQuery::new(Arc::clone(&store)),
//!     store,
//!     hub,
//! };
//!
//! // Create router with all endpoints
//! let app = create_router(state);
//!
//! // Start server
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod auth;
pub mod brackets;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use knockout::db::BracketStore;
use knockout::{BracketError, BracketSeeder, MatchResolver, StandingQuery};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::hub::NotificationHub;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// This state is cloned for each request (cheap due to Arc wrappers) and provides
/// access to the bracket operations.
///
/// # Fields
///
/// - `seeder`: Releases brackets for pending events
/// - `resolver`: Records match outcomes and advances winners
/// - `standing`: Read-only bracket and participation queries
/// - `store`: Storage gateway, used directly by the health check
/// - `hub`: Notification channels for connected entrants
#[derive(Clone)]
pub struct AppState {
    pub seeder: BracketSeeder,
    pub resolver: MatchResolver,
    pub standing: StandingQuery,
    pub store: Arc<dyn BracketStore>,
    pub hub: Arc<NotificationHub>,
}

/// Error payload returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message, sanitized for storage failures
    pub error: String,
    /// Stable error classification (`validation`, `authorization`, ...)
    pub kind: String,
}

/// Map a bracket error onto an HTTP status and JSON body.
///
/// Storage failures are logged at error level and reported to the client
/// as an opaque internal error.
pub(crate) fn error_response(err: &BracketError) -> (StatusCode, Json<ErrorResponse>) {
    use knockout::ErrorKind;

    let status = match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Bracket operation failed: {err}");
    }

    let body = ErrorResponse {
        error: err.client_message(),
        kind: err.kind().as_str().to_string(),
    };

    (status, Json(body))
}

/// Create the complete API router with all endpoints and middleware.
///
/// Constructs an Axum router with bracket, standings, and WebSocket endpoints
/// configured. Applies request correlation and CORS middleware to all routes.
///
/// # Arguments
///
/// - `state`: Application state with bracket operations
///
/// # Returns
///
/// Configured Axum router ready to serve requests
///
/// # Endpoint Summary
///
/// ```text
/// GET  /health                              - Health check (public)
/// POST /api/v1/events/{event_id}/bracket    - Seed bracket (owner or admin)
/// GET  /api/v1/events/{event_id}/bracket    - View bracket (public)
/// POST /api/v1/matches/{match_id}/winner    - Declare winner (owner or admin)
/// GET  /ws/{entrant_ref}                    - WebSocket notifications
/// ```
///
/// # Example
///
/// ```rust,no_run
/// # use ko_server::api::{AppState, create_router};
/// # async fn example(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    // API v1 routes (versioned for future evolution)
    let v1_routes = create_v1_router();

    // Root routes (health check, WebSocket - not versioned)
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/{entrant_ref}", get(websocket::websocket_handler));

    // Combine all routes
    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
///
/// This allows for future API evolution (v2, v3, etc.) while maintaining
/// backward compatibility with existing clients.
fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/events/{event_id}/bracket",
            get(brackets::get_bracket).post(brackets::start_bracket),
        )
        .route("/matches/{match_id}/winner", post(brackets::declare_winner))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Verifies database connectivity with a simple query and returns JSON with
/// health status and an appropriate HTTP status code.
///
/// # Response
///
/// Returns `200 OK` if the store is reachable, or `503 Service Unavailable` if not.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"0.1.0","database":true,"timestamp":"2026-08-21T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = state.store.health_check().await.is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
