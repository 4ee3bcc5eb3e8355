// ─── Sync orchestration ───
// One cycle for one game: resolve, list subscriptions, download what is
// missing, install what is downloaded, forget what is unsubscribed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::report::SyncReport;
use crate::core::api::ModSource;
use crate::core::downloader::{DownloadOutcome, DownloadResult, DownloadTask, Downloader};
use crate::core::error::{SyncError, SyncResult};
use crate::core::fs_utils::nuke_path;
use crate::core::installer::{InstallationResult, ModInstaller};
use crate::core::model::{Game, Mod, ModFile, ModFileKey, TargetPlatform};
use crate::core::storage::ModStorage;

/// Parallel metadata lookups against the API.
const METADATA_CONCURRENCY: usize = 8;

/// Characters that cannot appear in a file name on every supported OS.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

pub struct ModSynchronizer<S: ModSource> {
    source: S,
    downloader: Downloader,
    installer: ModInstaller,
    downloads_dir: PathBuf,
    platform: TargetPlatform,
}

impl<S: ModSource> ModSynchronizer<S> {
    pub fn new(
        source: S,
        downloader: Downloader,
        installer: ModInstaller,
        downloads_dir: impl Into<PathBuf>,
        platform: TargetPlatform,
    ) -> Self {
        Self {
            source,
            downloader,
            installer,
            downloads_dir: downloads_dir.into(),
            platform,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run one full cycle for the game whose slug is `game_name_id`.
    ///
    /// Per-file failures are counted in the report. Failing to resolve the game,
    /// to list subscriptions or to persist the store aborts the cycle.
    pub async fn sync_game(
        &self,
        store: &mut ModStorage,
        game_name_id: &str,
    ) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();

        let game = self.source.resolve_game_by_name_id(game_name_id).await?;
        let subscribed = self
            .source
            .list_subscribed_mods(game.id, self.platform)
            .await?;
        info!(
            "{} subscribed mod(s) for {} on {}",
            subscribed.len(),
            game.name_id,
            self.platform
        );

        // ── Downloads ───────────────────────────────────
        let files = self
            .fetch_missing_files(store, &game, &subscribed, &mut report)
            .await;
        let tasks = self.build_download_tasks(&game, files, &mut report).await;

        if !tasks.is_empty() {
            let (succeeded, failed): (Vec<DownloadResult>, Vec<DownloadResult>) = self
                .downloader
                .download_all(tasks)
                .await
                .into_iter()
                .partition(|r| r.is_ok());

            for failure in &failed {
                if let DownloadOutcome::Error { reason } = &failure.outcome {
                    warn!("Download failed for {}: {}", failure.task.key, reason);
                }
            }
            report.downloaded = succeeded.len();
            report.download_failures += failed.len();
            store.record_downloads(&succeeded).await?;
        }

        // ── Installs ────────────────────────────────────
        let install_tasks = store.compute_install_tasks(&game, &subscribed, self.platform);
        if !install_tasks.is_empty() {
            let extractions = self.installer.extractions_dir().to_path_buf();
            reset_dir(&extractions).await?;

            let (succeeded, failed): (Vec<InstallationResult>, Vec<InstallationResult>) = self
                .installer
                .install_all(install_tasks)
                .await
                .into_iter()
                .partition(|r| r.is_ok());

            for failure in &failed {
                warn!("Install failed for {}: {:?}", failure.task.key, failure.outcome);
            }
            report.installed = succeeded.len();
            report.install_failures = failed.len();
            store.record_installations(&succeeded).await?;

            remove_dir(&extractions).await;
        }

        // ── Prune ───────────────────────────────────────
        report.removed = store
            .prune_unsubscribed(&game.name_id, &subscribed)
            .await?
            .into_iter()
            .collect();

        info!("Sync of {} finished: {}", game.name_id, report);
        Ok(report)
    }

    /// Metadata for every available subscribed mod whose live file is not downloaded yet.
    async fn fetch_missing_files<'a>(
        &self,
        store: &ModStorage,
        game: &Game,
        subscribed: &'a [Mod],
        report: &mut SyncReport,
    ) -> Vec<(&'a Mod, ModFile)> {
        let wanted: Vec<_> = subscribed
            .iter()
            .filter(|m| {
                if !m.is_available() {
                    debug!("{} is not available, skipping", m.name_id);
                }
                m.is_available()
            })
            .filter_map(|m| {
                let live = m.live_mod_file_id(self.platform);
                if live.is_none() {
                    debug!("{} has no live file for {}", m.name_id, self.platform);
                }
                live.map(|id| (m, id))
            })
            .filter(|(m, live)| store.needs_download(&game.name_id, &m.name_id, *live))
            .collect();

        let fetched: Vec<_> = stream::iter(wanted)
            .map(|(m, live)| async move {
                let file = self.source.get_mod_file(game.id, m.id, live).await;
                (m, file)
            })
            .buffer_unordered(METADATA_CONCURRENCY)
            .collect()
            .await;

        let mut files = Vec::with_capacity(fetched.len());
        for (m, file) in fetched {
            match file {
                Ok(file) => files.push((m, file)),
                Err(e) => {
                    warn!("Could not fetch file metadata for {}: {}", m.name_id, e);
                    report.metadata_failures += 1;
                }
            }
        }
        files
    }

    /// Apply the virus and expiry policy, then create destination folders.
    async fn build_download_tasks(
        &self,
        game: &Game,
        files: Vec<(&Mod, ModFile)>,
        report: &mut SyncReport,
    ) -> Vec<DownloadTask> {
        let now = Utc::now();
        let mut tasks = Vec::with_capacity(files.len());

        for (m, file) in files {
            if !file.is_installable() {
                warn!("{} file {} is flagged by the virus scan, skipping", m.name_id, file.id);
                report.skipped += 1;
                continue;
            }
            if file.download.is_expired(now) {
                warn!("{} file {} download link has expired, skipping", m.name_id, file.id);
                report.skipped += 1;
                continue;
            }
            if !file.is_scanned() {
                warn!(
                    "{} file {} has not been virus scanned yet ({:?})",
                    m.name_id, file.id, file.virus_status
                );
            }

            let dir = self.downloads_dir.join(&game.name_id).join(&m.name_id);
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                warn!("{}", SyncError::io(&dir, e));
                report.download_failures += 1;
                continue;
            }

            let filename = generate_filename(&game.name_id, &m.name_id, &file, self.platform);
            tasks.push(DownloadTask {
                url: file.download.binary_url.clone(),
                dest: dir.join(filename),
                key: ModFileKey::new(&game.name_id, &m.name_id, file.id),
                expected_size: (file.filesize > 0).then_some(file.filesize),
            });
        }
        tasks
    }
}

/// `<game>_<mod>_<version>_<platform><archive suffixes>`, skipping empty parts.
pub fn generate_filename(
    game_name_id: &str,
    mod_name_id: &str,
    file: &ModFile,
    platform: TargetPlatform,
) -> String {
    let name = [
        game_name_id,
        mod_name_id,
        file.version.as_deref().unwrap_or_default(),
        platform.as_str(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join("_");

    let name: String = name
        .chars()
        .map(|c| if FORBIDDEN_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    format!("{}{}", name, file.archive_suffixes())
}

async fn reset_dir(dir: &Path) -> SyncResult<()> {
    let target = dir.to_path_buf();
    tokio::task::spawn_blocking(move || nuke_path(&target))
        .await
        .map_err(|e| SyncError::Other(format!("cleanup of {dir:?} failed: {e}")))??;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SyncError::io(dir, e))
}

async fn remove_dir(dir: &Path) {
    let target = dir.to_path_buf();
    match tokio::task::spawn_blocking(move || nuke_path(&target)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Could not remove {:?}: {}", dir, e),
        Err(e) => warn!("Could not remove {:?}: {}", dir, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Download, FileHash, ModFileId, ModId, VirusStatus};

    fn file(filename: &str, version: Option<&str>) -> ModFile {
        ModFile {
            id: ModFileId(7),
            mod_id: ModId(3),
            filename: filename.to_string(),
            version: version.map(str::to_string),
            filesize: 10,
            filehash: FileHash::default(),
            virus_status: VirusStatus::ScanComplete,
            virus_positive: false,
            download: Download {
                binary_url: "http://localhost/file".to_string(),
                date_expires: 0,
            },
            platforms: Vec::new(),
        }
    }

    #[test]
    fn filename_has_every_part() {
        let name = generate_filename(
            "bonelab",
            "cool-sword",
            &file("sword_v2.zip", Some("2.0")),
            TargetPlatform::Windows,
        );
        assert_eq!(name, "bonelab_cool-sword_2.0_windows.zip");
    }

    #[test]
    fn filename_drops_missing_version() {
        let name = generate_filename(
            "bonelab",
            "pack",
            &file("pack.tar.gz", None),
            TargetPlatform::Oculus,
        );
        assert_eq!(name, "bonelab_pack_oculus.tar.gz");

        let name = generate_filename("bonelab", "pack", &file("pack", Some("")), TargetPlatform::Linux);
        assert_eq!(name, "bonelab_pack_linux");
    }

    #[test]
    fn filename_never_contains_separators() {
        let name = generate_filename(
            "g",
            "m",
            &file("a.zip", Some("1.0/beta")),
            TargetPlatform::Windows,
        );
        assert_eq!(name, "g_m_1.0_beta_windows.zip");
    }
}
