use std::path::Path;

use tracing::warn;

use crate::core::error::{SyncError, SyncResult};
use crate::core::fs_utils::nuke_path;

/// Extract every entry of the zip at `archive` into `destination`.
///
/// Anything already at `destination` is destroyed first. Entries whose names
/// would escape `destination` are skipped.
pub fn extract_zip_file(archive: &Path, destination: &Path) -> SyncResult<()> {
    let zip_file = std::fs::File::open(archive).map_err(|source| SyncError::io(archive, source))?;
    let mut zip = zip::ZipArchive::new(zip_file)?;

    nuke_path(destination)?;
    std::fs::create_dir_all(destination).map_err(|source| SyncError::io(destination, source))?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;

        let Some(rel_path) = entry.enclosed_name() else {
            warn!("Skipping unsafe entry {:?} in {:?}", entry.name(), archive);
            continue;
        };
        let out_path = destination.join(rel_path);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|source| SyncError::io(&out_path, source))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SyncError::io(parent, source))?;
        }

        let mut out =
            std::fs::File::create(&out_path).map_err(|source| SyncError::io(&out_path, source))?;
        std::io::copy(&mut entry, &mut out).map_err(|source| SyncError::io(&out_path, source))?;
    }

    Ok(())
}
