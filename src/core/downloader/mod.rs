pub mod client;
pub mod task;

pub use client::{DownloadProgress, Downloader, DEFAULT_MAX_FILE_SIZE};
pub use task::{DownloadOutcome, DownloadResult, DownloadTask};
