use std::io::Read;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use crate::core::error::{SyncError, SyncResult};

/// Files are hashed in fixed-size chunks so large archives never sit in memory.
pub const HASH_CHUNK_SIZE: usize = 4096;

/// Lowercase hex MD5 of a file. Used for local change detection only.
pub fn md5_file(path: &Path) -> SyncResult<String> {
    let mut file = std::fs::File::open(path).map_err(|e| SyncError::io(path, e))?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buf).map_err(|e| SyncError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// [`md5_file`] on the blocking pool.
pub async fn md5_file_blocking(path: PathBuf) -> SyncResult<String> {
    tokio::task::spawn_blocking(move || md5_file(&path))
        .await
        .map_err(|e| SyncError::Other(format!("Task join error: {e}")))?
}
