//! HTTP API exposing OCR over uploaded PDF documents

mod handlers;
mod responses;
mod routes;

pub use responses::{ApiError, ErrorResponse, ExtractTextResponse, HealthResponse, RootResponse};
pub use routes::*;

use crate::domain::ports::DocumentProcessor;
use anyhow::Result;
use axum::{extract::DefaultBodyLimit, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct ApiState {
    pub processor: Arc<dyn DocumentProcessor>,
}

impl ApiState {
    pub fn new(processor: Arc<dyn DocumentProcessor>) -> Self {
        Self { processor }
    }
}

/// Create the API application
pub fn create_app(state: ApiState, max_upload_bytes: usize) -> Router {
    Router::new()
        .merge(create_status_routes())
        .merge(create_document_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("🌐 API server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("API server stopped");
    Ok(())
}
