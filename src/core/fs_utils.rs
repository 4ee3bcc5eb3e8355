use std::path::Path;

use crate::core::error::{SyncError, SyncResult};

/// Remove whatever lives at `path`. A missing path is a no-op.
pub fn nuke_path(path: &Path) -> SyncResult<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(SyncError::io(path, e)),
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|source| SyncError::io(path, source))
}

/// Recursively copy `source` into `destination`, creating it if needed.
pub fn copy_dir_recursive(source: &Path, destination: &Path) -> SyncResult<()> {
    std::fs::create_dir_all(destination).map_err(|e| SyncError::io(destination, e))?;

    for entry in std::fs::read_dir(source).map_err(|e| SyncError::io(source, e))? {
        let entry = entry.map_err(|e| SyncError::io(source, e))?;
        let src_path = entry.path();
        let dst_path = destination.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| SyncError::io(&src_path, e))?;

        if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else if file_type.is_file() {
            std::fs::copy(&src_path, &dst_path).map_err(|e| SyncError::io(&dst_path, e))?;
        }
    }

    Ok(())
}
