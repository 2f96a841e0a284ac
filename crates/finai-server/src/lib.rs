//! HTTP entry point for finai
//!
//! Routes:
//!
//! - `POST /api/analyze`: run the lenient analysis pipeline
//! - `POST /api/upload`: store a document in the upload directory
//! - `GET /*`: the single-page front end, falling back to `index.html`

pub mod error;
pub mod handlers;

pub use error::{ApiError, ErrorBody, ErrorResponse, error_chain};
pub use handlers::{UPLOAD_FIELD, UploadResponse};

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use finai_analysis::{Analyzer, AppConfig};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Largest accepted upload body
pub const UPLOAD_LIMIT_BYTES: usize = 32 * 1024 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, analyzer: Arc<Analyzer>) -> Self {
        Self { config, analyzer }
    }

    /// Analyzer reading files through the snapshot cache
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let analyzer = Arc::new(Analyzer::with_cached_files(config.clone()));
        Self::new(config, analyzer)
    }

    pub(crate) fn reject(&self, err: impl Into<ApiError>) -> ErrorResponse {
        err.into().with_details(self.config.expose_error_details)
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let static_dir = &state.config.static_dir;
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/api/analyze", post(handlers::analyze))
        .route(
            "/api/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .fallback_service(spa)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
