// Staging area for raw uploads.
// Files are named after the server-generated request id; the client's filename
// only contributes a sanitized extension.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const FALLBACK_EXTENSION: &str = "bin";
const MAX_EXTENSION_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub request_id: Uuid,
    pub path: PathBuf,
    pub original_filename: Option<String>,
    pub size: usize,
}

#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
    keep_files: bool,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>, keep_files: bool) -> Self {
        Self {
            dir: dir.into(),
            keep_files,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, request_id: Uuid, original_filename: Option<&str>) -> PathBuf {
        self.dir.join(format!(
            "{}.{}",
            request_id,
            safe_extension(original_filename)
        ))
    }

    /// Writes the upload to `<dir>/<request id>.<ext>`, creating the directory if needed.
    pub async fn stage(
        &self,
        request_id: Uuid,
        original_filename: Option<String>,
        data: &[u8],
    ) -> std::io::Result<StagedUpload> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(request_id, original_filename.as_deref());
        tokio::fs::write(&path, data).await?;
        debug!(%request_id, "Staged {} bytes at {}", data.len(), path.display());

        Ok(StagedUpload {
            request_id,
            path,
            original_filename,
            size: data.len(),
        })
    }

    /// Removes a staged file once the pipeline is done with it, unless configured to keep it.
    pub async fn release(&self, staged: &StagedUpload) {
        if self.keep_files {
            return;
        }
        match tokio::fs::remove_file(&staged.path).await {
            Ok(()) => debug!(request_id = %staged.request_id, "Removed staged file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                request_id = %staged.request_id,
                "Failed to remove staged file {}: {}",
                staged.path.display(),
                e
            ),
        }
    }
}

/// Lower-cased extension of the client filename when it is short and purely
/// ASCII alphanumeric; `bin` otherwise. Path separators and dots never survive.
pub fn safe_extension(original_filename: Option<&str>) -> String {
    original_filename
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .and_then(|base| {
            let (stem, ext) = base.rsplit_once('.')?;
            (!stem.is_empty()).then_some(ext)
        })
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.bytes().all(|b| b.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}
