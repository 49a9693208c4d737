// Main entry point for enhance-server.
// Accepts an image upload, has the generative image service enhance it, and
// serves the result back. Sets up configuration, logging, shared state, the
// Axum router and the HTTP listener.

mod enhance;
mod shutdown_signal;
mod storage;
mod web;

use clap::Parser;
use enhance::{DEFAULT_API_BASE, DEFAULT_MODEL, Enhancer, GeminiClient, GeminiClientConfig};
use shutdown_signal::shutdown_signal;
use std::{path::PathBuf, sync::Arc, time::Duration};
use storage::{DEFAULT_LATEST_NAME, ResultStore, RetentionPolicy, SWEEP_INTERVAL, StagingArea};
use tracing::Level;
use web::{AppOptions, AppState, FailureMode, MAX_IMAGE_SIZE_BYTES};

/// Command line arguments for enhance-server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct AppConfig {
    /// Hostname/IP to bind the server to.
    /// If this option is specified without value, it will default to "*", meaning the server will listen on all interfaces.
    #[arg(long, env = "ENHANCE_SERVER_HOST", default_value = "localhost", num_args = 0..=1, default_missing_value = "*")]
    host: String,

    /// Port number to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Directory where raw uploads are staged before processing.
    #[arg(long, env = "ENHANCE_SERVER_STAGING_DIR", default_value = "image/get")]
    staging_dir: PathBuf,

    /// Directory holding enhancement results, including the shared `test.jpg` slot.
    #[arg(long, env = "ENHANCE_SERVER_OUTPUT_DIR", default_value = "image/imagetest")]
    output_dir: PathBuf,

    /// Directory with the static front end.
    #[arg(long, env = "ENHANCE_SERVER_PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,

    /// API key for the generative image service.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Model used for enhancement.
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the generative service API.
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Timeout for a single call to the generative service, in seconds.
    #[arg(long, env = "ENHANCE_SERVER_REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    request_timeout_secs: u64,

    /// Maximum accepted upload size in bytes.
    #[arg(long, env = "ENHANCE_SERVER_MAX_UPLOAD_BYTES", default_value_t = MAX_IMAGE_SIZE_BYTES)]
    max_upload_bytes: usize,

    /// How long per-request results are kept, in seconds.
    #[arg(long, env = "ENHANCE_SERVER_RESULT_TTL_SECS", default_value_t = 3600)]
    result_ttl_secs: u64,

    /// Maximum number of per-request results kept at once.
    #[arg(long, env = "ENHANCE_SERVER_MAX_RESULTS", default_value_t = 64)]
    max_results: usize,

    /// Keep staged uploads on disk after processing.
    #[arg(long, env = "ENHANCE_SERVER_KEEP_STAGED", action = clap::ArgAction::SetTrue)]
    keep_staged: bool,

    /// How POST /upload answers when enhancement fails.
    #[arg(long, env = "ENHANCE_SERVER_ON_FAILURE", value_enum, default_value_t = FailureMode::Status)]
    on_failure: FailureMode,
}

#[tokio::main]
async fn main() {
    // Parse command line args and environment variables
    let config = AppConfig::parse();

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO) // Set to DEBUG to see service commentary and staging details
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting enhance-server...");

    let client = GeminiClient::new(GeminiClientConfig {
        api_base: config.api_base.clone(),
        api_key: config.api_key.clone(),
        model: config.model.clone(),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    })
    .unwrap_or_else(|err| {
        tracing::error!("FATAL: Failed to initialize the generative service client: {}", err);
        std::process::exit(1);
    });
    tracing::info!("Generative service endpoint: {}", client.endpoint());

    let staging = StagingArea::new(&config.staging_dir, config.keep_staged);
    tracing::info!("Staging uploads in: {}", staging.dir().display());

    let results = Arc::new(ResultStore::new(
        &config.output_dir,
        DEFAULT_LATEST_NAME,
        RetentionPolicy {
            ttl: Duration::from_secs(config.result_ttl_secs),
            max_entries: config.max_results,
        },
    ));
    tracing::info!(
        "Writing results to: {} (latest at {})",
        results.output_dir().display(),
        results.latest_path().display()
    );

    if config.on_failure == FailureMode::Redirect {
        tracing::warn!("Enhancement failures will be answered with a redirect, not an error status");
    }

    let state = AppState {
        enhancer: Arc::new(Enhancer::new(client)),
        staging: Arc::new(staging),
        results: results.clone(),
        failure_mode: config.on_failure,
    };

    let app = web::create_app(
        state,
        &AppOptions {
            public_dir: config.public_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
        },
    );
    tracing::info!("Axum router configured.");

    let sweeper = storage::spawn_sweeper(results, SWEEP_INTERVAL);

    // --- Start HTTP Server ---
    let listener = match web::create_listener(&config.host, config.port).await {
        Ok((addr, l)) => {
            tracing::info!("Server successfully bound. Listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("FATAL: Failed to bind server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server run error: {}", e);
    }

    sweeper.abort();
    tracing::info!("enhance-server has shut down.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_layout() {
        let config = AppConfig::try_parse_from(["enhance-server", "--api-key", "k"]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.staging_dir, PathBuf::from("image/get"));
        assert_eq!(config.output_dir, PathBuf::from("image/imagetest"));
        assert_eq!(config.on_failure, FailureMode::Status);
        assert!(!config.keep_staged);
    }

    #[test]
    fn test_bare_host_flag_means_all_interfaces() {
        let config = AppConfig::try_parse_from([
            "enhance-server",
            "--api-key",
            "k",
            "--host",
            "--on-failure",
            "redirect",
        ])
        .unwrap();
        assert_eq!(config.host, "*");
        assert_eq!(config.on_failure, FailureMode::Redirect);
    }

    #[test]
    fn test_api_key_is_required() {
        // Only meaningful when the variable is not set in the test environment.
        if std::env::var_os("GEMINI_API_KEY").is_none() {
            assert!(AppConfig::try_parse_from(["enhance-server"]).is_err());
        }
    }
}
