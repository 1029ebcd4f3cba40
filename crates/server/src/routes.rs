//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    // Middleware layers apply in reverse order (outermost first).
    // Order of execution: TraceLayer -> CORS -> body limit -> handler
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/upload", post(handlers::upload))
        .route("/upload_chunk", post(handlers::upload_chunk))
        .route("/upload_complete", post(handlers::upload_complete))
        .route("/download/{id}", get(handlers::download))
        .route("/get/{id}", get(handlers::file_info))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
