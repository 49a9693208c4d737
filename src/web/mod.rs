// Web server module
// Handles the upload form, result retrieval and static assets

mod app;
mod error;
mod extract_request_data;
mod handlers;
mod headers;
mod listeners;
mod media_type;
mod models;

pub use app::{AppOptions, create_app};
pub use listeners::create_listener;

use crate::enhance::Enhancer;
use crate::storage::{ResultStore, StagingArea};
use std::sync::Arc;

// Default maximum size for image upload requests
pub const MAX_IMAGE_SIZE_BYTES: usize = 20 * 1024 * 1024; // 20MB

pub type SharedResultStore = Arc<ResultStore>;

/// How POST /upload answers when the enhancement step fails.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Report the failure with a 4xx/5xx status.
    #[default]
    Status,
    /// Log the failure and redirect as if it had succeeded.
    Redirect,
}

#[derive(Clone)]
pub struct AppState {
    pub enhancer: Arc<Enhancer>,
    pub staging: Arc<StagingArea>,
    pub results: SharedResultStore,
    pub failure_mode: FailureMode,
}
