// Error types for the HTTP layer

use crate::enhance::EnhanceError;
use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::PathRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    InternalServerError(String),
    BadGateway(String),
    GatewayTimeout(String),

    // The shared result slot has not been written yet. Rendered as plain text
    // because the browser shows it directly in place of the image.
    ResultNotReady,
    ResultNotFound(Uuid),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::ResultNotReady | Self::ResultNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

const RESULT_NOT_READY_MESSAGE: &str = "The enhanced image is not available yet.";

impl ApiError {
    pub fn message(&self) -> String {
        match self {
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::PayloadTooLarge(msg)
            | Self::InternalServerError(msg)
            | Self::BadGateway(msg)
            | Self::GatewayTimeout(msg) => msg.clone(),
            Self::ResultNotFound(id) => format!("No completed result for request {}", id),
            Self::ResultNotReady => RESULT_NOT_READY_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let Self::ResultNotReady = self {
            return (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                RESULT_NOT_READY_MESSAGE,
            )
                .into_response();
        }

        let body = Json(json!({
            "error": {
                "status": status.as_u16(),
                "message": self.message(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<EnhanceError> for ApiError {
    fn from(error: EnhanceError) -> Self {
        match error {
            EnhanceError::InputMissing(_) | EnhanceError::Io(_) => {
                Self::InternalServerError(error.to_string())
            }
            EnhanceError::Timeout => Self::GatewayTimeout(error.to_string()),
            EnhanceError::Transport(_)
            | EnhanceError::Upstream { .. }
            | EnhanceError::MalformedResponse(_)
            | EnhanceError::NoCandidates
            | EnhanceError::NoImagePart
            | EnhanceError::InvalidImageData(_) => Self::BadGateway(error.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(format!("Uploaded file is too large: {}", error.body_text()))
        } else {
            Self::BadRequest(format!("Invalid multipart request: {}", error.body_text()))
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(format!("Invalid request id: {}", rejection.body_text()))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(error: std::io::Error) -> Self {
        Self::InternalServerError(format!("An I/O error occurred: {}", error))
    }
}
