// API handlers for the web server

use super::{
    AppState, FailureMode,
    error::ApiError,
    extract_request_data::{UploadedImage, extract_uploaded_image},
    headers,
    media_type::sniff_image_mime,
    models::{ResultStatusResponse, UploadResponse},
};
use crate::storage::{JobStatus, StagedUpload};
use axum::{
    Json,
    extract::{Multipart, Path, State, rejection::PathRejection},
    http::{HeaderName, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Response},
};
use axum_extra::{TypedHeader, typed_header::TypedHeaderRejection};
use std::path::PathBuf;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

// --- POST /upload ---
// Stages the uploaded image, runs the enhancement synchronously and then
// redirects home (form posts) or reports the request id (JSON clients).
pub async fn upload_image(
    State(state): State<AppState>,
    accept: Result<TypedHeader<headers::Accept>, TypedHeaderRejection>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let prefers_json = accept
        .map(|TypedHeader(accept)| accept.prefers_json())
        .unwrap_or(false);

    let request_id = Uuid::new_v4();
    info!(%request_id, "Receiving image upload");

    let Some(upload) = extract_uploaded_image(multipart).await? else {
        error!(%request_id, "No file was uploaded");
        return Err(ApiError::BadRequest("No file was uploaded.".to_string()));
    };

    // Detached so a client that disconnects mid-call cannot strand a pending
    // entry or a staged file.
    let outcome = tokio::spawn(process_upload(state.clone(), request_id, upload))
        .await
        .map_err(|e| {
            error!(%request_id, "Upload pipeline task failed: {}", e);
            ApiError::InternalServerError("Upload processing was interrupted.".to_string())
        })??;

    upload_outcome_response(state.failure_mode, prefers_json, request_id, outcome)
}

/// Stage, enhance, record, release. The outer error is a staging failure,
/// which happens before the request is known to the result store.
async fn process_upload(
    state: AppState,
    request_id: Uuid,
    upload: UploadedImage,
) -> Result<Result<PathBuf, ApiError>, ApiError> {
    let staged = state
        .staging
        .stage(request_id, upload.filename, &upload.data)
        .await?;
    info!(
        %request_id,
        "Processing image {:?} ({} bytes, {})",
        staged.original_filename.as_deref().unwrap_or("unnamed"),
        staged.size,
        upload.content_type.as_deref().unwrap_or("unknown type")
    );

    state
        .results
        .begin(request_id, staged.original_filename.clone())
        .await;

    let outcome = run_enhancement(&state, &staged).await;
    state.staging.release(&staged).await;

    Ok(outcome)
}

/// Enhances a staged upload and records the outcome in the result store.
pub async fn run_enhancement(
    state: &AppState,
    staged: &StagedUpload,
) -> Result<PathBuf, ApiError> {
    let request_id = staged.request_id;

    let image = match state.enhancer.enhance(request_id, &staged.path).await {
        Ok(image) => image,
        Err(err) => {
            if err.is_upstream() {
                warn!(%request_id, "Enhancement failed at the generative service: {}", err);
            } else {
                error!(%request_id, "Enhancement failed: {}", err);
            }
            state.results.fail(request_id, err.to_string()).await;
            return Err(err.into());
        }
    };

    info!(
        %request_id,
        "Received {} bytes of {} from the generative service",
        image.data.len(),
        image.mime_type
    );

    match state.results.complete(request_id, &image.data).await {
        Ok(path) => Ok(path),
        Err(err) => {
            error!(%request_id, "Failed to save enhanced image: {}", err);
            state
                .results
                .fail(request_id, format!("failed to save result: {}", err))
                .await;
            Err(err.into())
        }
    }
}

/// Turns the pipeline outcome into the HTTP answer for the uploader.
/// In `Redirect` mode failures are swallowed and the uploader is sent home anyway.
pub fn upload_outcome_response(
    failure_mode: FailureMode,
    prefers_json: bool,
    request_id: Uuid,
    outcome: Result<PathBuf, ApiError>,
) -> Result<Response, ApiError> {
    let status = match outcome {
        Ok(_) => JobStatus::Completed,
        Err(err) => match failure_mode {
            FailureMode::Status => return Err(err),
            FailureMode::Redirect => {
                warn!(
                    %request_id,
                    "Answering as if the upload succeeded: {}",
                    err.message()
                );
                JobStatus::Failed {
                    message: err.message(),
                }
            }
        },
    };

    info!(%request_id, "Upload finished");

    if prefers_json {
        return Ok((
            AppendHeaders([(X_REQUEST_ID, request_id.to_string())]),
            Json(UploadResponse::new(request_id, status)),
        )
            .into_response());
    }

    Ok((
        StatusCode::FOUND,
        AppendHeaders([
            (header::LOCATION, "/".to_string()),
            (X_REQUEST_ID, request_id.to_string()),
        ]),
    )
        .into_response())
}

// --- GET /get-image ---
// Serves the most recently completed result.
pub async fn get_latest_image(State(state): State<AppState>) -> Result<Response, ApiError> {
    let path = state.results.latest_path();
    info!("Looking up the latest enhanced image");

    match tokio::fs::read(&path).await {
        Ok(data) => {
            info!("Serving {} ({} bytes)", path.display(), data.len());
            Ok(image_response(data))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("The enhanced image is not available yet");
            Err(ApiError::ResultNotReady)
        }
        Err(err) => Err(err.into()),
    }
}

// --- GET /results/{uuid} ---
pub async fn get_result_image(
    State(state): State<AppState>,
    request_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(request_id) = request_id?;
    let path = state
        .results
        .completed_path(request_id)
        .await
        .ok_or(ApiError::ResultNotFound(request_id))?;

    match tokio::fs::read(&path).await {
        Ok(data) => Ok(image_response(data)),
        // Evicted between the lookup and the read.
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::ResultNotFound(request_id))
        }
        Err(err) => Err(err.into()),
    }
}

// --- GET /results/{uuid}/status ---
pub async fn get_result_status(
    State(state): State<AppState>,
    request_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ResultStatusResponse>, ApiError> {
    let Path(request_id) = request_id?;
    let entry = state.results.entry(request_id).await.ok_or_else(|| {
        ApiError::NotFound(format!("Request with ID {} not found", request_id))
    })?;

    Ok(Json(ResultStatusResponse::new(request_id, entry)))
}

fn image_response(data: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, sniff_image_mime(&data)),
            (header::CACHE_CONTROL, "no-store"),
        ],
        data,
    )
        .into_response()
}
