//! Router configuration for filedrop.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{download, index, list_entries, upload, AppState};

/// Create the main router.
///
/// `max_upload_size` caps request bodies in bytes.
pub fn create_router(app_state: Arc<AppState>, max_upload_size: u64) -> Router {
    let body_limit = usize::try_from(max_upload_size).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/download", get(download))
        .route("/api/entries", get(list_entries))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
