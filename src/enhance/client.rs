// HTTP client for the generative image service.

use super::{
    error::EnhanceError,
    gemini::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse},
};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp-image-generation";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiClientConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout: Duration,
}

/// Thin wrapper around `reqwest::Client` bound to one model.
/// Not `Debug`: holds the API key.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, EnhanceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EnhanceError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.api_base.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issues a single generateContent call. No retries.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, EnhanceError> {
        debug!("POST {}", self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnhanceError::Upstream {
                status: status.as_u16(),
                message: upstream_error_message(&body),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| EnhanceError::MalformedResponse(e.to_string()))
    }
}

// Prefer the structured error envelope; fall back to the raw (truncated) body.
fn upstream_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => match error.status {
            Some(status) => format!("{} ({})", error.message, status),
            None => error.message,
        },
        Err(_) => body.chars().take(500).collect(),
    }
}
