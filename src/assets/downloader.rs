//! Checksum-gated HTTP download manager.
//!
//! Each enqueued descriptor gets a background task that streams the body into
//! a sibling `.part` file while feeding an incremental SHA-256. Only a digest
//! match lets the file be installed (atomic rename); a mismatch or transport
//! failure deletes the partial file and surfaces `Failed`. Enqueueing is
//! idempotent per asset id while a task is in flight; a failed task can be
//! retried, which replaces it with a fresh one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use uuid::Uuid;

use super::catalog::AssetDescriptor;
use super::store::AssetStore;
use crate::{log_error, log_info};

const ENABLE_LOGS: bool = true;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Terminal or in-flight state of one download task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadState {
    Pending,
    InProgress,
    Verifying,
    Installed,
    Failed(DownloadError),
}

impl DownloadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadState::Installed | DownloadState::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("transfer failed: {0}")]
    Transfer(String),
    #[error("i/o error: {0}")]
    Io(String),
}

/// Observable progress of a task. `progress_percent` is `None` while the
/// total size is unknown: before the response headers arrive, and for the
/// whole transfer when the server sends no content length.
#[derive(Debug, Clone)]
pub struct DownloadStatus {
    pub state: DownloadState,
    pub progress_percent: Option<u8>,
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
}

impl DownloadStatus {
    fn pending() -> Self {
        Self {
            state: DownloadState::Pending,
            progress_percent: None,
            bytes_downloaded: 0,
            total_bytes: None,
        }
    }
}

/// Handle onto an enqueued download; cheap to clone.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub asset_id: String,
    pub task_id: Uuid,
    status: watch::Receiver<DownloadStatus>,
}

impl TaskHandle {
    pub fn status(&self) -> DownloadStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DownloadStatus> {
        self.status.clone()
    }

    /// Wait until the task reaches a terminal state.
    pub async fn wait(&self) -> DownloadStatus {
        let mut rx = self.status.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if current.state.is_terminal() {
                return current;
            }
            if rx.changed().await.is_err() {
                return self.status();
            }
        }
    }
}

pub struct DownloadManager {
    store: Arc<AssetStore>,
    client: reqwest::Client,
    tasks: Mutex<HashMap<String, TaskHandle>>,
}

impl DownloadManager {
    pub fn new(store: Arc<AssetStore>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(TRANSFER_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            store,
            client,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or join) the download for `descriptor`.
    ///
    /// While a task for the same asset id is in flight the existing handle is
    /// returned unchanged; a finished task (`Installed` or `Failed`) is
    /// replaced by a fresh one.
    pub fn enqueue(&self, descriptor: AssetDescriptor) -> TaskHandle {
        let mut tasks = self.tasks.lock();
        if let Some(existing) = tasks.get(&descriptor.id) {
            if !existing.status().state.is_terminal() {
                return existing.clone();
            }
        }

        let (tx, rx) = watch::channel(DownloadStatus::pending());
        let handle = TaskHandle {
            asset_id: descriptor.id.clone(),
            task_id: Uuid::new_v4(),
            status: rx,
        };
        tasks.insert(descriptor.id.clone(), handle.clone());

        let store = Arc::clone(&self.store);
        let client = self.client.clone();
        tokio::spawn(async move {
            run_download(client, store, descriptor, tx).await;
        });

        handle
    }

    /// Current status for an asset id, if it was ever enqueued.
    pub fn status_of(&self, asset_id: &str) -> Option<DownloadStatus> {
        self.tasks.lock().get(asset_id).map(TaskHandle::status)
    }
}

async fn run_download(
    client: reqwest::Client,
    store: Arc<AssetStore>,
    descriptor: AssetDescriptor,
    tx: watch::Sender<DownloadStatus>,
) {
    let fail = |tx: &watch::Sender<DownloadStatus>, error: DownloadError| {
        log_error!("download of {} failed: {error}", descriptor.id);
        tx.send_modify(|status| status.state = DownloadState::Failed(error));
    };

    let dest = match store.destination_for(&descriptor) {
        Ok(path) => path,
        Err(err) => return fail(&tx, DownloadError::Io(err.to_string())),
    };
    let temp = dest.with_extension("part");

    log_info!(
        "downloading {} from {} to {}",
        descriptor.id,
        descriptor.source_url,
        dest.display()
    );

    let response = match client.get(&descriptor.source_url).send().await {
        Ok(response) => response,
        Err(err) => return fail(&tx, DownloadError::Transfer(err.without_url().to_string())),
    };
    if let Err(err) = response.error_for_status_ref() {
        return fail(&tx, DownloadError::Transfer(err.without_url().to_string()));
    }

    let total_bytes = response.content_length().filter(|total| *total > 0);
    tx.send_modify(|status| {
        status.state = DownloadState::InProgress;
        status.total_bytes = total_bytes;
        status.progress_percent = total_bytes.map(|_| 0);
    });

    let mut file = match tokio::fs::File::create(&temp).await {
        Ok(file) => file,
        Err(err) => return fail(&tx, DownloadError::Io(err.to_string())),
    };

    let mut hasher = Sha256::new();
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = tokio::fs::remove_file(&temp).await;
                return fail(&tx, DownloadError::Transfer(err.without_url().to_string()));
            }
        };
        if let Err(err) = file.write_all(&chunk).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return fail(&tx, DownloadError::Io(err.to_string()));
        }
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        tx.send_modify(|status| {
            status.bytes_downloaded = downloaded;
            status.progress_percent =
                total_bytes.map(|total| ((downloaded * 100) / total).min(100) as u8);
        });
    }

    if let Err(err) = file.flush().await {
        let _ = tokio::fs::remove_file(&temp).await;
        return fail(&tx, DownloadError::Io(err.to_string()));
    }
    drop(file);

    tx.send_modify(|status| status.state = DownloadState::Verifying);
    let actual = format!("{:x}", hasher.finalize());
    if !actual.eq_ignore_ascii_case(descriptor.sha256.trim()) {
        let _ = tokio::fs::remove_file(&temp).await;
        return fail(
            &tx,
            DownloadError::ChecksumMismatch {
                expected: descriptor.sha256.to_lowercase(),
                actual,
            },
        );
    }

    if let Err(err) = AssetStore::install_atomic(&temp, &dest) {
        let _ = tokio::fs::remove_file(&temp).await;
        return fail(&tx, DownloadError::Io(err.to_string()));
    }

    log_info!("installed {} ({downloaded} bytes)", descriptor.id);
    tx.send_modify(|status| {
        status.state = DownloadState::Installed;
        status.progress_percent = Some(100);
    });
}
