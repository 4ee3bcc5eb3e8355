use std::path::PathBuf;

use crate::core::error::SyncError;
use crate::core::model::ModFileKey;

/// A single file to fetch. Created per sync cycle, never persisted.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: String,
    /// Destination file. Its parent directory must already exist.
    pub dest: PathBuf,
    pub key: ModFileKey,
    /// Size announced by the API, used when the server omits `Content-Length`.
    pub expected_size: Option<u64>,
}

#[derive(Debug)]
pub enum DownloadOutcome {
    Ok { total_bytes: u64 },
    Error { reason: SyncError },
}

/// Outcome of one task, tagged with the task itself.
#[derive(Debug)]
pub struct DownloadResult {
    pub task: DownloadTask,
    pub outcome: DownloadOutcome,
}

impl DownloadResult {
    pub fn ok(task: DownloadTask, total_bytes: u64) -> Self {
        Self {
            task,
            outcome: DownloadOutcome::Ok { total_bytes },
        }
    }

    pub fn error(task: DownloadTask, reason: SyncError) -> Self {
        Self {
            task,
            outcome: DownloadOutcome::Error { reason },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, DownloadOutcome::Ok { .. })
    }
}
