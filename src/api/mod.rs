// src/api/mod.rs

pub mod handlers;

use crate::config::Config;
use crate::error::ApiError;
use crate::llm::InvoiceStructurer;
use crate::pdf_extract::TextExtractor;
use crate::report::Summarizer;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Header carrying the shared API secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub extractor: Arc<dyn TextExtractor>,
    pub structurer: Arc<dyn InvoiceStructurer>,
    /// `None` when narrative summaries are switched off.
    pub summarizer: Option<Arc<dyn Summarizer>>,
}

/// Build the API router with all endpoints.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.server.max_upload_mb * 1024 * 1024;

    Router::new()
        .route("/extract", post(handlers::extract_invoice))
        .route("/report", post(handlers::report_invoice))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        // added after route_layer, so it stays public
        .route("/health", get(handlers::health_check))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reject the request unless `x-api-key` equals the configured secret.
/// With no secret configured every request is rejected.
pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let authorized = match (&state.config.api_key, provided) {
        (Some(expected), Some(key)) => key == expected.expose(),
        _ => false,
    };

    if authorized {
        next.run(req).await
    } else {
        warn!(
            path = %req.uri().path(),
            has_key = provided.is_some(),
            "Rejected unauthenticated request"
        );
        ApiError::Unauthorized.into_response()
    }
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState) -> Result<(), std::io::Error> {
    let addr = state.config.bind_addr();
    if state.config.api_key.is_none() {
        warn!("No API key configured (COMMON_API_KEY); all protected endpoints will reject requests");
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /health   - liveness");
    info!("  POST /extract  - PDF -> structured JSON");
    info!("  POST /report   - PDF -> consistency report");

    axum::serve(listener, app).await
}
