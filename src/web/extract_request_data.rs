use axum::extract::Multipart;
use tracing::{debug, warn};

use super::error::ApiError;

// Name of the form field carrying the image, as posted by the upload form.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// Pulls the first non-empty `image` field out of a multipart form.
/// Returns `Ok(None)` when the form has no such field.
pub async fn extract_uploaded_image(
    mut multipart: Multipart,
) -> Result<Option<UploadedImage>, ApiError> {
    let mut uploaded: Option<UploadedImage> = None;
    let mut ignored_fields = 0;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            let field_name = field.name().unwrap_or("unnamed").to_string();
            debug!("Ignoring multipart field: {}", field_name);
            ignored_fields += 1;
            continue;
        }

        if uploaded.is_some() {
            warn!("Multiple '{}' fields found in multipart request, using the first one", IMAGE_FIELD);
            ignored_fields += 1;
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        debug!(
            "Received file {:?} with content type: {:?}",
            filename, content_type
        );

        let data = field.bytes().await?.to_vec();

        if data.is_empty() {
            // A file input submitted with nothing selected arrives as an empty part.
            debug!("Ignoring empty '{}' field", IMAGE_FIELD);
            continue;
        }

        uploaded = Some(UploadedImage {
            data,
            filename,
            content_type,
        });
    }

    if ignored_fields > 0 {
        debug!("Ignored {} fields in multipart request", ignored_fields);
    }

    Ok(uploaded)
}
