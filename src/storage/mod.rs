// On-disk state: raw uploads waiting for processing and the results they produce.

mod result_store;
mod staging;

pub use result_store::{
    DEFAULT_LATEST_NAME, JobStatus, ResultEntry, ResultStore, RetentionPolicy, unix_millis,
};
pub use staging::{StagedUpload, StagingArea};

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically evicts expired results until the task is aborted.
pub fn spawn_sweeper(store: Arc<ResultStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.evict(SystemTime::now()).await;
            if evicted > 0 {
                tracing::info!(
                    "Result sweep evicted {} entries, {} remain",
                    evicted,
                    store.len().await
                );
            }
        }
    })
}
