// API-specific data models for the web server

use crate::storage::{JobStatus, ResultEntry, unix_millis};
use serde::Serialize;
use uuid::Uuid;

/// JSON answer to POST /upload for clients that ask for JSON.
#[derive(Serialize, Debug, Clone)]
pub struct UploadResponse {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub status: JobStatus,
    pub result_url: String,
    pub status_url: String,
}

impl UploadResponse {
    pub fn new(request_id: Uuid, status: JobStatus) -> Self {
        Self {
            request_id,
            status,
            result_url: result_url(request_id),
            status_url: status_url(request_id),
        }
    }
}

/// Response of GET /results/{id}/status
#[derive(Serialize, Debug, Clone)]
pub struct ResultStatusResponse {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub status: JobStatus,
    pub original_filename: Option<String>,
    pub created_at_ms: u64,
    pub finished_at_ms: Option<u64>,
}

impl ResultStatusResponse {
    pub fn new(request_id: Uuid, entry: ResultEntry) -> Self {
        Self {
            request_id,
            status: entry.status,
            original_filename: entry.original_filename,
            created_at_ms: unix_millis(entry.created_at),
            finished_at_ms: entry.finished_at.map(unix_millis),
        }
    }
}

pub fn result_url(request_id: Uuid) -> String {
    format!("/results/{}", request_id)
}

pub fn status_url(request_id: Uuid) -> String {
    format!("/results/{}/status", request_id)
}
