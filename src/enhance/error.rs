// Error type for the enhancement pipeline.
// Every failure between "read staged file" and "decoded image bytes" ends up here,
// so the HTTP layer can pick a status instead of pretending the call succeeded.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnhanceError {
    /// The staged upload disappeared before the pipeline could read it.
    #[error("input file not found: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network-level failure talking to the generative service.
    #[error("failed to reach the generative service: {0}")]
    Transport(String),

    #[error("the generative service did not answer in time")]
    Timeout,

    /// Non-success HTTP status from the generative service.
    #[error("generative service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("malformed response from the generative service: {0}")]
    MalformedResponse(String),

    #[error("the generative service returned no candidates")]
    NoCandidates,

    #[error("the generative service returned no image")]
    NoImagePart,

    #[error("the returned image data is not valid base64: {0}")]
    InvalidImageData(#[from] base64::DecodeError),
}

impl From<reqwest::Error> for EnhanceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EnhanceError::Timeout
        } else if err.is_decode() {
            EnhanceError::MalformedResponse(err.to_string())
        } else {
            EnhanceError::Transport(err.to_string())
        }
    }
}

impl EnhanceError {
    /// True when the failure originated at the generative service rather than locally.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, EnhanceError::InputMissing(_) | EnhanceError::Io(_))
    }
}
