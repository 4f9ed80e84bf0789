pub mod barcode;
pub mod cache;
pub mod clock;
pub mod completion;
pub mod config;
pub mod encoder;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod store;

use axum::{
    Router,
    routing::{get, post},
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{services::ServeFile, trace::TraceLayer};

use crate::handlers::{current_handler, generate_handler, health_handler, metrics_handler};
use crate::state::AppState;

// All routes; `/` serves index.html out of `static_dir`
pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route("/api/current", get(current_handler))
        .route("/generate", post(generate_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
