use super::{AppState, MAX_IMAGE_SIZE_BYTES, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::path::PathBuf;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::Level;

#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Directory with the HTML/CSS/JS front end, served for every unrouted path.
    pub public_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("public"),
            max_upload_bytes: MAX_IMAGE_SIZE_BYTES,
        }
    }
}

pub fn create_app(state: AppState, options: &AppOptions) -> Router {
    Router::new()
        .route("/upload", post(handlers::upload_image))
        // Most recently completed result
        .route("/get-image", get(handlers::get_latest_image))
        // Per-request results
        .route("/results/{uuid}", get(handlers::get_result_image))
        .route("/results/{uuid}/status", get(handlers::get_result_status))
        // Everything else is a static asset
        .fallback_service(ServeDir::new(&options.public_dir))
        // Apply a layer to limit the maximum size of request bodies
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        .with_state(state)
}
