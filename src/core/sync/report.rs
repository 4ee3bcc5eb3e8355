use serde::Serialize;

/// Counters for one sync cycle of one game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub downloaded: usize,
    pub download_failures: usize,
    /// Mods whose file metadata could not be fetched.
    pub metadata_failures: usize,
    /// Files refused by the virus or expiry policy.
    pub skipped: usize,
    pub installed: usize,
    pub install_failures: usize,
    /// Mod slugs forgotten because they are no longer subscribed.
    pub removed: Vec<String>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        self.download_failures + self.metadata_failures + self.install_failures > 0
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "downloaded {} ({} failed, {} metadata errors, {} skipped), installed {} ({} failed), removed {}",
            self.downloaded,
            self.download_failures,
            self.metadata_failures,
            self.skipped,
            self.installed,
            self.install_failures,
            self.removed.len()
        )
    }
}
