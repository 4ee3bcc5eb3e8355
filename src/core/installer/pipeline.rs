use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::extract::extract_zip_file;
use super::resolver::{
    locate_content_folders, select_content_folders, PlatformKeywords, SelectionPolicy,
};
use super::task::{InstallFailReason, InstallationResult, InstallationTask};
use crate::core::error::{SyncError, SyncResult};
use crate::core::fs_utils::{copy_dir_recursive, nuke_path};

/// Extracts downloaded archives and copies their content folder(s) into the
/// game's mods directory.
#[derive(Debug, Clone)]
pub struct ModInstaller {
    extractions_dir: PathBuf,
    mods_dir: PathBuf,
    keywords: PlatformKeywords,
    policy: SelectionPolicy,
    workers: usize,
}

impl ModInstaller {
    pub fn new(extractions_dir: impl Into<PathBuf>, mods_dir: impl Into<PathBuf>) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            extractions_dir: extractions_dir.into(),
            mods_dir: mods_dir.into(),
            keywords: PlatformKeywords::default(),
            policy: SelectionPolicy::default(),
            workers,
        }
    }

    pub fn with_keywords(mut self, keywords: PlatformKeywords) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn mods_dir(&self) -> &Path {
        &self.mods_dir
    }

    /// Scratch root; each archive is extracted into its own child folder.
    pub fn extractions_dir(&self) -> &Path {
        &self.extractions_dir
    }

    /// Install every task on the blocking pool, at most `workers` at a time.
    /// Results arrive in completion order.
    pub async fn install_all(&self, tasks: Vec<InstallationTask>) -> Vec<InstallationResult> {
        info!(
            "Installing {} archive(s) into {:?}, workers={}",
            tasks.len(),
            self.mods_dir,
            self.workers
        );

        stream::iter(tasks)
            .map(|task| {
                let installer = self.clone();
                async move {
                    let fallback = task.clone();
                    match tokio::task::spawn_blocking(move || installer.extract_and_install(task))
                        .await
                    {
                        Ok(result) => result,
                        Err(e) => InstallationResult::fail(
                            fallback,
                            InstallFailReason::Io(format!("install worker failed: {e}")),
                        ),
                    }
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await
    }

    /// Extract one archive, pick its content folder(s) and copy them into the
    /// mods directory. Blocking.
    pub fn extract_and_install(&self, task: InstallationTask) -> InstallationResult {
        let stem = task
            .archive
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| task.key.mod_name_id.clone());
        let scratch = self.extractions_dir.join(stem);

        debug!("Extracting {:?} -> {:?}", task.archive, scratch);
        if let Err(e) = extract_zip_file(&task.archive, &scratch) {
            warn!("Could not extract {:?} for {}: {}", task.archive, task.key, e);
            return InstallationResult::fail(task, InstallFailReason::Io(e.to_string()));
        }

        let result = self.install_from(&scratch, task);
        if let Err(e) = nuke_path(&scratch) {
            warn!("Could not clean extraction folder {:?}: {}", scratch, e);
        }
        result
    }

    fn install_from(&self, scratch: &Path, task: InstallationTask) -> InstallationResult {
        let candidates = match locate_content_folders(scratch) {
            Ok(candidates) => candidates,
            Err(e) => return InstallationResult::fail(task, InstallFailReason::Io(e.to_string())),
        };

        let selected =
            match select_content_folders(scratch, candidates, self.policy, &self.keywords) {
                Ok(selected) => selected,
                Err(reason) => {
                    warn!("Nothing to install for {}: {}", task.key, reason);
                    return InstallationResult::fail(task, reason);
                }
            };

        let mut installed_paths = Vec::with_capacity(selected.len());
        for folder in &selected {
            match self.copy_into_mods_dir(folder) {
                Ok(dest) => installed_paths.push(dest),
                Err(e) => {
                    warn!("Could not install {:?} for {}: {}", folder, task.key, e);
                    return InstallationResult::fail(task, InstallFailReason::Io(e.to_string()));
                }
            }
        }

        info!("Installed {} -> {:?}", task.key, installed_paths);
        InstallationResult::ok(task, installed_paths)
    }

    /// Replace `<mods_dir>/<folder name>` with a copy of `folder`.
    fn copy_into_mods_dir(&self, folder: &Path) -> SyncResult<PathBuf> {
        let name = folder.file_name().ok_or_else(|| {
            SyncError::Other(format!("content folder {:?} has no name", folder))
        })?;
        let dest = self.mods_dir.join(name);

        nuke_path(&dest)?;
        copy_dir_recursive(folder, &dest)?;
        Ok(dest)
    }
}
