//! Route definitions for the campusdesk API.

pub mod health;
pub mod tables;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::AppState;

/// Largest accepted request body; table bodies carry only filters and settings.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let origin = match state.config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            tracing::warn!(error = %e, url = %state.config.frontend_url, "Invalid FRONTEND_URL, allowing any origin");
            AllowOrigin::any()
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    let table_routes = Router::new()
        .route("/tables", get(tables::index))
        .route("/tables/{table_key}", post(tables::list));

    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api/v1", table_routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
