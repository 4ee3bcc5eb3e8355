use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the whole sync backend.
/// Every module returns `Result<T, SyncError>`.
#[derive(Debug, Error)]
pub enum SyncError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Download of {url} is {actual} bytes, more than the accepted {max_accepted}")]
    DownloadTooLarge {
        url: String,
        max_accepted: u64,
        actual: u64,
    },

    #[error("Download of {url} delivered {received} bytes, expected {expected}")]
    DownloadSizeMismatch {
        url: String,
        expected: u64,
        received: u64,
    },

    #[error("Download of {url} has no declared size")]
    DownloadSizeUnknown { url: String },

    #[error("Download of {url} stalled for {seconds}s")]
    DownloadStalled { url: String, seconds: u64 },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Storage contract ────────────────────────────────
    #[error("Cannot record failed download for {game}/{mod_name} (file {mod_file_id}): {reason}")]
    UnrecordableDownload {
        game: String,
        mod_name: String,
        mod_file_id: u64,
        reason: String,
    },

    #[error("Cannot record failed installation for {game}/{mod_name} (file {mod_file_id}): {reason}")]
    UnrecordableInstallation {
        game: String,
        mod_name: String,
        mod_file_id: u64,
        reason: String,
    },

    #[error("No managed mod {game}/{mod_name} to record an installation against")]
    UnknownManagedMod { game: String, mod_name: String },

    #[error("Unsupported storage schema version {0}")]
    UnsupportedStorageVersion(u64),

    // ── Game resolution ─────────────────────────────────
    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("Game name {name_id} matches {count} games")]
    AmbiguousGame { name_id: String, count: usize },

    // ── Config ──────────────────────────────────────────
    #[error("Config error: {0}")]
    Config(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Attach a path to a bare `std::io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(source: std::io::Error) -> Self {
        SyncError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
