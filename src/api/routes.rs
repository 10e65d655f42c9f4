//! API route definitions

use super::{handlers::*, ApiState};
use axum::{
    routing::{get, post},
    Router,
};

/// Liveness routes used by the container health check
pub fn create_status_routes() -> Router<ApiState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

/// Document processing routes
pub fn create_document_routes() -> Router<ApiState> {
    Router::new()
        .route("/ocr", post(ocr))
        .route("/extract-text", post(extract_text))
}
