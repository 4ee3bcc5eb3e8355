use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::task::{DownloadResult, DownloadTask};
use crate::core::error::{SyncError, SyncResult};

/// Largest archive accepted from the API.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;
const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Aggregate byte counter shared by every task of a batch. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct DownloadProgress {
    downloaded: Arc<AtomicU64>,
}

impl DownloadProgress {
    pub fn bytes_downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    fn add(&self, bytes: u64) {
        self.downloaded.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// Concurrent, streaming mod-file downloader.
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel downloads.
    concurrency: usize,
    max_file_size: u64,
    /// Longest wait for the next body chunk before the task is failed.
    stall_timeout: Duration,
    progress: DownloadProgress,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            concurrency: DEFAULT_CONCURRENCY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            progress: DownloadProgress::default(),
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    pub fn progress(&self) -> DownloadProgress {
        self.progress.clone()
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download every task, at most `concurrency` at a time.
    ///
    /// Returns one result per task, in completion order. A failing task never
    /// affects its siblings.
    pub async fn download_all(&self, tasks: Vec<DownloadTask>) -> Vec<DownloadResult> {
        info!(
            "Starting batch download: {} files, concurrency={}",
            tasks.len(),
            self.concurrency
        );

        let results: Vec<DownloadResult> = stream::iter(tasks)
            .map(|task| self.download_task(task))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        info!(
            "Batch download finished: {} ok, {} failed, {} bytes",
            results.len() - failed,
            failed,
            self.progress.bytes_downloaded()
        );
        results
    }

    /// Run one task, converting any failure into an error result. Partial
    /// files are removed.
    pub async fn download_task(&self, task: DownloadTask) -> DownloadResult {
        match self.download_file(&task).await {
            Ok(total_bytes) => {
                debug!("Downloaded: {} -> {:?} ({} bytes)", task.url, task.dest, total_bytes);
                DownloadResult::ok(task, total_bytes)
            }
            Err(reason) => {
                warn!("Download of {} failed: {}", task.key, reason);
                if let Err(e) = tokio::fs::remove_file(&task.dest).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove partial file {:?}: {}", task.dest, e);
                    }
                }
                DownloadResult::error(task, reason)
            }
        }
    }

    // ── Single file download ────────────────────────────

    /// Stream `task.url` into `task.dest`. The parent directory must exist.
    ///
    /// Returns the number of bytes written, which always equals the declared size.
    async fn download_file(&self, task: &DownloadTask) -> SyncResult<u64> {
        let mut file = tokio::fs::File::create(&task.dest)
            .await
            .map_err(|e| SyncError::io(&task.dest, e))?;

        let response = self.client.get(&task.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::DownloadFailed {
                url: task.url.clone(),
                status: status.as_u16(),
            });
        }

        let declared = response
            .content_length()
            .or(task.expected_size)
            .ok_or_else(|| SyncError::DownloadSizeUnknown {
                url: task.url.clone(),
            })?;
        if declared > self.max_file_size {
            return Err(SyncError::DownloadTooLarge {
                url: task.url.clone(),
                max_accepted: self.max_file_size,
                actual: declared,
            });
        }

        let mut stream = response.bytes_stream();
        let mut written = 0_u64;
        loop {
            let next = tokio::time::timeout(self.stall_timeout, stream.next())
                .await
                .map_err(|_| SyncError::DownloadStalled {
                    url: task.url.clone(),
                    seconds: self.stall_timeout.as_secs(),
                })?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;

            file.write_all(&chunk)
                .await
                .map_err(|e| SyncError::io(&task.dest, e))?;
            written += chunk.len() as u64;
            self.progress.add(chunk.len() as u64);

            if written > declared {
                break;
            }
        }

        file.flush().await.map_err(|e| SyncError::io(&task.dest, e))?;

        if written != declared {
            return Err(SyncError::DownloadSizeMismatch {
                url: task.url.clone(),
                expected: declared,
                received: written,
            });
        }

        Ok(written)
    }
}
