//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `session` - Scanning, device selection and connecting
//! - `records` - Connection history, paired devices and notifications
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

pub mod error;
pub mod health;
pub mod openapi;
pub mod records;
pub mod session;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                    - Health check
/// /swagger-ui                - Interactive API documentation
/// /api
/// ├── /session               - Session view, scan, select, cancel, connect
/// ├── /history               - Connection history (GET, DELETE)
/// ├── /paired                - Paired devices (GET, DELETE /{address})
/// ├── /notifications         - Recent status messages
/// └── /openapi.json          - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .nest("/session", session::router())
                .nest("/history", records::history_router())
                .nest("/paired", records::paired_router())
                .route("/notifications", get(records::get_notifications))
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .with_state(state)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/swagger-ui/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
