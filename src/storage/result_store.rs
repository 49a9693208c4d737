// Keyed store of enhancement results.
//
// Each request id gets its own file under the output directory. The most recently
// completed result is also copied to a shared "latest" slot, which is what the
// legacy GET /get-image route serves. All writes go through a temp file + rename.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const RESULT_EXTENSION: &str = "jpg";
pub const DEFAULT_LATEST_NAME: &str = "test";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct ResultEntry {
    pub status: JobStatus,
    pub original_filename: Option<String>,
    pub created_at: SystemTime,
    pub finished_at: Option<SystemTime>,
}

#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_entries: 64,
        }
    }
}

#[derive(Debug)]
pub struct ResultStore {
    output_dir: PathBuf,
    latest_name: String,
    retention: RetentionPolicy,
    entries: RwLock<HashMap<Uuid, ResultEntry>>,
}

impl ResultStore {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        latest_name: impl Into<String>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            latest_name: latest_name.into(),
            retention,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output>/<latest>.jpg`, the shared slot holding the last completed result.
    pub fn latest_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.latest_name, RESULT_EXTENSION))
    }

    pub fn result_path(&self, request_id: Uuid) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", request_id, RESULT_EXTENSION))
    }

    pub async fn begin(&self, request_id: Uuid, original_filename: Option<String>) {
        let entry = ResultEntry {
            status: JobStatus::Pending,
            original_filename,
            created_at: SystemTime::now(),
            finished_at: None,
        };
        self.entries.write().await.insert(request_id, entry);
    }

    /// Persists `data` for `request_id`, then publishes it to the latest slot.
    pub async fn complete(&self, request_id: Uuid, data: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let path = self.result_path(request_id);
        write_atomic(&path, data).await?;
        write_atomic(&self.latest_path(), data).await?;
        info!(%request_id, "Saved enhanced image ({} bytes) to {}", data.len(), path.display());

        let mut entries = self.entries.write().await;
        let entry = entries.entry(request_id).or_insert_with(|| ResultEntry {
            status: JobStatus::Pending,
            original_filename: None,
            created_at: SystemTime::now(),
            finished_at: None,
        });
        entry.status = JobStatus::Completed;
        entry.finished_at = Some(SystemTime::now());

        Ok(path)
    }

    pub async fn fail(&self, request_id: Uuid, message: impl Into<String>) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(&request_id) {
            entry.status = JobStatus::Failed {
                message: message.into(),
            };
            entry.finished_at = Some(SystemTime::now());
        }
    }

    pub async fn entry(&self, request_id: Uuid) -> Option<ResultEntry> {
        self.entries.read().await.get(&request_id).cloned()
    }

    /// Path of a completed result; `None` while pending, after failure, or once evicted.
    pub async fn completed_path(&self, request_id: Uuid) -> Option<PathBuf> {
        match self.entries.read().await.get(&request_id) {
            Some(ResultEntry {
                status: JobStatus::Completed,
                ..
            }) => Some(self.result_path(request_id)),
            _ => None,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drops entries past the TTL, pending or not, then the oldest finished entries
    /// beyond the size cap. The latest slot is untouched.
    pub async fn evict(&self, now: SystemTime) -> usize {
        let mut evicted = Vec::new();
        {
            let mut entries = self.entries.write().await;

            // A pending entry older than the TTL belongs to a pipeline that never finished.
            entries.retain(|id, entry| {
                let expired = now
                    .duration_since(entry.created_at)
                    .is_ok_and(|age| age > self.retention.ttl);
                if expired {
                    evicted.push(*id);
                }
                !expired
            });

            if entries.len() > self.retention.max_entries {
                let mut finished: Vec<(Uuid, SystemTime)> = entries
                    .iter()
                    .filter(|(_, e)| e.status != JobStatus::Pending)
                    .map(|(id, e)| (*id, e.created_at))
                    .collect();
                finished.sort_by_key(|(_, created)| *created);

                let overflow = entries.len() - self.retention.max_entries;
                for (id, _) in finished.into_iter().take(overflow) {
                    entries.remove(&id);
                    evicted.push(id);
                }
            }
        }

        for id in &evicted {
            match tokio::fs::remove_file(self.result_path(*id)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(request_id = %id, "Failed to remove evicted result: {}", e),
            }
        }

        if !evicted.is_empty() {
            debug!("Evicted {} result(s)", evicted.len());
        }
        evicted.len()
    }
}

/// Writes to a sibling temp file and renames it over `path`, so concurrent
/// readers see either the old file or the new one.
pub async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("result");
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    let result = match tokio::fs::write(&tmp, data).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        // A short write or failed rename must not leave the temp file behind.
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
