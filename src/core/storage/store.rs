use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use futures_util::future::try_join_all;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::hashing::{md5_file, md5_file_blocking};
use super::model::{DownloadedManagedMod, InstalledManagedMod, ManagedMod, Storage};
use crate::core::downloader::{DownloadOutcome, DownloadResult};
use crate::core::error::{SyncError, SyncResult};
use crate::core::fs_utils::nuke_path;
use crate::core::installer::{InstallationOutcome, InstallationResult, InstallationTask};
use crate::core::model::{Game, Mod, ModFileId, ModFileKey, TargetPlatform};

/// Parallel validations; each one may hash a large archive.
const VALIDATION_CONCURRENCY: usize = 8;

/// Sole authority on what has been downloaded and installed for each game/mod.
///
/// Every mutation rewrites the whole document atomically. Mutating methods take
/// `&mut self`, so one store has a single writer.
pub struct ModStorage {
    path: PathBuf,
    storage: Storage,
}

impl ModStorage {
    /// Read the document at `path` (or start empty), re-verify every entry
    /// against the filesystem and write the result back.
    pub async fn load(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        let storage = match tokio::fs::read_to_string(&path).await {
            Ok(json) => {
                let value: serde_json::Value = serde_json::from_str(&json)?;
                Storage::from_value(value)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No storage at {:?}, starting empty", path);
                Storage::default()
            }
            Err(e) => return Err(SyncError::io(&path, e)),
        };

        let mut store = Self { path, storage };
        store.validate().await;
        store.save().await?;

        info!(
            "Loaded storage {:?}: {} games, {} managed mods",
            store.path,
            store.storage.games.len(),
            store.storage.games.values().map(|g| g.len()).sum::<usize>()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn managed_mod(&self, game_name_id: &str, mod_name_id: &str) -> Option<&ManagedMod> {
        self.storage.get_mod(game_name_id, mod_name_id)
    }

    /// True unless `mod_file_id` is already downloaded or installed for the mod.
    pub fn needs_download(&self, game_name_id: &str, mod_name_id: &str, mod_file_id: ModFileId) -> bool {
        match self.storage.get_mod(game_name_id, mod_name_id) {
            Some(managed) => !(managed.is_downloaded(mod_file_id) || managed.is_installed(mod_file_id)),
            None => true,
        }
    }

    /// True if the mod is managed and `mod_file_id` is not the installed file.
    pub fn needs_installation(
        &self,
        game_name_id: &str,
        mod_name_id: &str,
        mod_file_id: ModFileId,
    ) -> bool {
        self.storage
            .get_mod(game_name_id, mod_name_id)
            .is_some_and(|managed| !managed.is_installed(mod_file_id))
    }

    /// Record successful downloads. The batch must contain successes only.
    pub async fn record_downloads(&mut self, results: &[DownloadResult]) -> SyncResult<()> {
        for result in results {
            if let DownloadOutcome::Error { reason } = &result.outcome {
                return Err(unrecordable_download(&result.task.key, reason.to_string()));
            }
        }

        let hashes = try_join_all(
            results
                .iter()
                .map(|result| md5_file_blocking(result.task.dest.clone())),
        )
        .await?;

        let mut superseded = Vec::new();
        for (result, file_hash) in results.iter().zip(hashes) {
            let key = &result.task.key;
            let managed = self.storage.entry(&key.game_name_id, &key.mod_name_id);
            let previous = managed.downloaded_mod.replace(DownloadedManagedMod {
                mod_file_id: key.mod_file_id,
                file_path: result.task.dest.clone(),
                file_hash,
            });
            if let Some(previous) = previous.filter(|p| p.file_path != result.task.dest) {
                superseded.push(previous.file_path);
            }
            debug!("Recorded download {} at {:?}", key, result.task.dest);
        }

        self.save().await?;
        self.remove_unreferenced(superseded).await;
        Ok(())
    }

    /// Record successful installations. Each one must follow a recorded download.
    pub async fn record_installations(&mut self, results: &[InstallationResult]) -> SyncResult<()> {
        for result in results {
            let key = &result.task.key;
            if let InstallationOutcome::Fail { reason } = &result.outcome {
                return Err(SyncError::UnrecordableInstallation {
                    game: key.game_name_id.clone(),
                    mod_name: key.mod_name_id.clone(),
                    mod_file_id: key.mod_file_id.0,
                    reason: reason.to_string(),
                });
            }
            if self.storage.get_mod(&key.game_name_id, &key.mod_name_id).is_none() {
                return Err(SyncError::UnknownManagedMod {
                    game: key.game_name_id.clone(),
                    mod_name: key.mod_name_id.clone(),
                });
            }
        }

        let mut superseded = Vec::new();
        for result in results {
            let InstallationOutcome::Ok { installed_paths } = &result.outcome else {
                continue;
            };
            let key = &result.task.key;
            if let Some(managed) = self.storage.get_mod_mut(&key.game_name_id, &key.mod_name_id) {
                let previous = managed.installed_mod.replace(InstalledManagedMod {
                    mod_file_id: key.mod_file_id,
                    installed_paths: installed_paths.clone(),
                });
                if let Some(previous) = previous {
                    superseded.extend(
                        previous
                            .installed_paths
                            .into_iter()
                            .filter(|p| !installed_paths.contains(p)),
                    );
                }
                debug!("Recorded installation {} -> {:?}", key, installed_paths);
            }
        }

        self.save().await?;
        self.remove_unreferenced(superseded).await;
        Ok(())
    }

    /// Install work for subscribed mods whose live file is downloaded but not installed.
    pub fn compute_install_tasks(
        &self,
        game: &Game,
        subscribed_mods: &[Mod],
        platform: TargetPlatform,
    ) -> Vec<InstallationTask> {
        subscribed_mods
            .iter()
            .filter_map(|m| {
                let live = m.live_mod_file_id(platform)?;
                let managed = self.storage.get_mod(&game.name_id, &m.name_id)?;
                let downloaded = managed
                    .downloaded_mod
                    .as_ref()
                    .filter(|d| d.mod_file_id == live)?;
                if managed.is_installed(live) {
                    return None;
                }
                Some(InstallationTask {
                    archive: downloaded.file_path.clone(),
                    key: ModFileKey::new(&game.name_id, &m.name_id, live),
                })
            })
            .collect()
    }

    /// Forget every managed mod of the game that is no longer subscribed,
    /// deleting its installed folders and archive. Returns the removed keys.
    pub async fn prune_unsubscribed(
        &mut self,
        game_name_id: &str,
        subscribed_mods: &[Mod],
    ) -> SyncResult<BTreeSet<String>> {
        let subscribed: HashSet<&str> = subscribed_mods.iter().map(|m| m.name_id.as_str()).collect();

        let Some(game) = self.storage.games.get_mut(game_name_id) else {
            return Ok(BTreeSet::new());
        };

        let removed: BTreeSet<String> = game
            .keys()
            .filter(|name| !subscribed.contains(name.as_str()))
            .cloned()
            .collect();

        let mut doomed = Vec::new();
        for name in &removed {
            if let Some(managed) = game.remove(name) {
                doomed.push((name.clone(), managed));
            }
        }
        if game.is_empty() {
            self.storage.games.remove(game_name_id);
        }

        for (name, managed) in doomed {
            remove_managed_files(managed).await;
            info!("Removed unsubscribed mod {}/{}", game_name_id, name);
        }

        if !removed.is_empty() {
            self.save().await?;
        }
        Ok(removed)
    }

    /// Drop every half that no longer matches the filesystem, then every empty entry.
    async fn validate(&mut self) {
        let entries: Vec<(String, String, ManagedMod)> = std::mem::take(&mut self.storage.games)
            .into_iter()
            .flat_map(|(game, mods)| {
                mods.into_iter()
                    .map(move |(name, managed)| (game.clone(), name, managed))
            })
            .collect();

        let validated: Vec<(String, String, ManagedMod)> = stream::iter(entries)
            .map(|(game, name, managed)| async move {
                match tokio::task::spawn_blocking(move || validate_managed_mod(managed)).await {
                    Ok(managed) => Some((game, name, managed)),
                    Err(e) => {
                        warn!("Validation of {}/{} aborted: {}", game, name, e);
                        None
                    }
                }
            })
            .buffer_unordered(VALIDATION_CONCURRENCY)
            .filter_map(|entry| async move { entry })
            .collect()
            .await;

        for (game, name, managed) in validated {
            if managed.is_empty() {
                debug!("Dropping empty managed mod {}/{}", game, name);
                continue;
            }
            self.storage.games.entry(game).or_default().insert(name, managed);
        }
    }

    /// Delete files left behind by replaced records, unless another record
    /// still points at them.
    async fn remove_unreferenced(&self, paths: Vec<PathBuf>) {
        let referenced: HashSet<&Path> = self
            .storage
            .games
            .values()
            .flat_map(|mods| mods.values())
            .flat_map(|managed| {
                let archive = managed.downloaded_mod.iter().map(|d| d.file_path.as_path());
                let installed = managed
                    .installed_mod
                    .iter()
                    .flat_map(|i| i.installed_paths.iter().map(PathBuf::as_path));
                archive.chain(installed)
            })
            .collect();
        let doomed: Vec<PathBuf> = paths
            .into_iter()
            .filter(|p| !referenced.contains(p.as_path()))
            .collect();
        remove_paths(doomed).await;
    }

    async fn save(&self) -> SyncResult<()> {
        let json = serde_json::to_string_pretty(&self.storage)?;
        write_atomic(&self.path, json.as_bytes()).await
    }
}

fn unrecordable_download(key: &ModFileKey, reason: String) -> SyncError {
    SyncError::UnrecordableDownload {
        game: key.game_name_id.clone(),
        mod_name: key.mod_name_id.clone(),
        mod_file_id: key.mod_file_id.0,
        reason,
    }
}

fn validate_managed_mod(mut managed: ManagedMod) -> ManagedMod {
    if let Some(downloaded) = &managed.downloaded_mod {
        if !downloaded_is_intact(downloaded) {
            debug!("Archive {:?} missing or changed", downloaded.file_path);
            managed.downloaded_mod = None;
        }
    }
    if let Some(installed) = &managed.installed_mod {
        if !installed_is_intact(installed) {
            debug!("Installed paths {:?} incomplete", installed.installed_paths);
            managed.installed_mod = None;
        }
    }
    managed
}

fn downloaded_is_intact(downloaded: &DownloadedManagedMod) -> bool {
    if !downloaded.file_path.is_file() {
        return false;
    }
    match md5_file(&downloaded.file_path) {
        Ok(hash) => hash.eq_ignore_ascii_case(&downloaded.file_hash),
        Err(e) => {
            warn!("Cannot hash {:?}: {}", downloaded.file_path, e);
            false
        }
    }
}

fn installed_is_intact(installed: &InstalledManagedMod) -> bool {
    !installed.installed_paths.is_empty() && installed.installed_paths.iter().all(|p| p.is_dir())
}

async fn remove_managed_files(managed: ManagedMod) {
    let mut paths = Vec::new();
    if let Some(installed) = managed.installed_mod {
        paths.extend(installed.installed_paths);
    }
    if let Some(downloaded) = managed.downloaded_mod {
        paths.push(downloaded.file_path);
    }
    remove_paths(paths).await;
}

/// Best-effort delete; missing paths are a no-op.
async fn remove_paths(paths: Vec<PathBuf>) {
    for path in paths {
        let target = path.clone();
        match tokio::task::spawn_blocking(move || nuke_path(&target)).await {
            Ok(Ok(())) => debug!("Deleted {:?}", path),
            Ok(Err(e)) => warn!("Could not delete {:?}: {}", path, e),
            Err(e) => warn!("Could not delete {:?}: {}", path, e),
        }
    }
}

/// Write to a sibling temp file, then rename over `path`.
async fn write_atomic(path: &Path, contents: &[u8]) -> SyncResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SyncError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "storage.json".to_string());
    let temp_path = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

    tokio::fs::write(&temp_path, contents)
        .await
        .map_err(|e| SyncError::io(&temp_path, e))?;

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(SyncError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::DownloadTask;
    use crate::core::installer::InstallFailReason;
    use crate::core::model::{GameId, ModId, ModPlatform};

    const GAME: &str = "game";

    fn game() -> Game {
        Game {
            id: GameId(1),
            name: "Game".into(),
            name_id: GAME.into(),
        }
    }

    fn subscribed(name_id: &str, live: u64) -> Mod {
        Mod {
            id: ModId(live * 100),
            game_id: GameId(1),
            name: name_id.to_uppercase(),
            name_id: name_id.into(),
            platforms: vec![ModPlatform {
                platform: TargetPlatform::Windows,
                modfile_live: ModFileId(live),
            }],
            visible: true,
            modfile: None,
        }
    }

    fn download_ok(dest: &Path, mod_name: &str, file_id: u64) -> DownloadResult {
        DownloadResult::ok(
            DownloadTask {
                url: format!("https://example.com/{mod_name}.zip"),
                dest: dest.to_path_buf(),
                key: ModFileKey::new(GAME, mod_name, ModFileId(file_id)),
                expected_size: None,
            },
            std::fs::metadata(dest).map(|m| m.len()).unwrap_or_default(),
        )
    }

    fn install_ok(archive: &Path, mod_name: &str, file_id: u64, paths: Vec<PathBuf>) -> InstallationResult {
        InstallationResult::ok(
            InstallationTask {
                archive: archive.to_path_buf(),
                key: ModFileKey::new(GAME, mod_name, ModFileId(file_id)),
            },
            paths,
        )
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        root: PathBuf,
        storage_path: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let root = tmp.path().to_path_buf();
            let storage_path = root.join("storage.json");
            Self {
                _tmp: tmp,
                root,
                storage_path,
            }
        }

        fn archive(&self, mod_name: &str, contents: &[u8]) -> PathBuf {
            let dir = self.root.join("downloads").join(GAME).join(mod_name);
            std::fs::create_dir_all(&dir).unwrap();
            let path = dir.join(format!("{mod_name}_v1.zip"));
            std::fs::write(&path, contents).unwrap();
            path
        }

        fn installed_dir(&self, name: &str) -> PathBuf {
            let dir = self.root.join("mods").join(name);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("pallet.json"), b"{}").unwrap();
            dir
        }

        async fn load(&self) -> ModStorage {
            ModStorage::load(&self.storage_path).await.unwrap()
        }
    }

    #[tokio::test]
    async fn load_without_file_starts_empty_and_persists() {
        let fx = Fixture::new();
        let store = fx.load().await;

        assert!(store.storage().games.is_empty());
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&fx.storage_path).unwrap()).unwrap();
        assert_eq!(written["version"], 1);
    }

    #[tokio::test]
    async fn recorded_download_skips_redownload_but_needs_install() {
        let fx = Fixture::new();
        let archive = fx.archive("foo", b"archive-bytes");
        let mut store = fx.load().await;

        assert!(store.needs_download(GAME, "foo", ModFileId(10)));
        assert!(!store.needs_installation(GAME, "foo", ModFileId(10)));

        store.record_downloads(&[download_ok(&archive, "foo", 10)]).await.unwrap();

        assert!(!store.needs_download(GAME, "foo", ModFileId(10)));
        assert!(store.needs_installation(GAME, "foo", ModFileId(10)));
        // update case: a newer live file still needs downloading
        assert!(store.needs_download(GAME, "foo", ModFileId(11)));

        let recorded = store.managed_mod(GAME, "foo").unwrap().downloaded_mod.clone().unwrap();
        assert_eq!(recorded.file_hash, md5_file(&archive).unwrap());
    }

    #[tokio::test]
    async fn installed_file_needs_no_work() {
        let fx = Fixture::new();
        let archive = fx.archive("foo", b"data");
        let installed = fx.installed_dir("Foo");
        let mut store = fx.load().await;

        store.record_downloads(&[download_ok(&archive, "foo", 10)]).await.unwrap();
        store
            .record_installations(&[install_ok(&archive, "foo", 10, vec![installed])])
            .await
            .unwrap();

        assert!(!store.needs_download(GAME, "foo", ModFileId(10)));
        assert!(!store.needs_installation(GAME, "foo", ModFileId(10)));
        assert!(store.needs_download(GAME, "foo", ModFileId(12)));
        assert!(store.needs_installation(GAME, "foo", ModFileId(12)));
    }

    #[tokio::test]
    async fn altered_archive_is_dropped_on_reload() {
        let fx = Fixture::new();
        let archive = fx.archive("foo", b"original archive");
        let mut store = fx.load().await;
        store.record_downloads(&[download_ok(&archive, "foo", 10)]).await.unwrap();
        drop(store);

        std::fs::write(&archive, b"orig").unwrap();
        let store = fx.load().await;

        assert!(store.managed_mod(GAME, "foo").is_none());
        assert!(store.needs_download(GAME, "foo", ModFileId(10)));
    }

    #[tokio::test]
    async fn deleted_archive_is_dropped_on_reload() {
        let fx = Fixture::new();
        let archive = fx.archive("foo", b"zip");
        let mut store = fx.load().await;
        store.record_downloads(&[download_ok(&archive, "foo", 10)]).await.unwrap();
        assert!(!store.needs_download(GAME, "foo", ModFileId(10)));
        drop(store);

        std::fs::remove_file(&archive).unwrap();
        let store = fx.load().await;
        assert!(store.needs_download(GAME, "foo", ModFileId(10)));
    }

    #[tokio::test]
    async fn missing_install_dir_keeps_download_half() {
        let fx = Fixture::new();
        let archive = fx.archive("foo", b"zip");
        let installed = fx.installed_dir("Foo");
        let mut store = fx.load().await;
        store.record_downloads(&[download_ok(&archive, "foo", 10)]).await.unwrap();
        store
            .record_installations(&[install_ok(&archive, "foo", 10, vec![installed.clone()])])
            .await
            .unwrap();
        drop(store);

        std::fs::remove_dir_all(&installed).unwrap();
        let store = fx.load().await;
        let managed = store.managed_mod(GAME, "foo").unwrap();
        assert!(managed.is_downloaded(ModFileId(10)));
        assert!(managed.installed_mod.is_none());
        assert!(store.needs_installation(GAME, "foo", ModFileId(10)));
    }

    #[tokio::test]
    async fn validation_is_idempotent() {
        let fx = Fixture::new();
        let kept = fx.archive("kept", b"kept");
        let broken = fx.archive("broken", b"broken");
        let mut store = fx.load().await;
        store
            .record_downloads(&[download_ok(&kept, "kept", 1), download_ok(&broken, "broken", 2)])
            .await
            .unwrap();
        drop(store);
        std::fs::write(&broken, b"tampered").unwrap();

        fx.load().await;
        let first = std::fs::read_to_string(&fx.storage_path).unwrap();
        fx.load().await;
        let second = std::fs::read_to_string(&fx.storage_path).unwrap();

        assert_eq!(first, second);
        assert!(first.contains("kept"));
        assert!(!first.contains("broken"));
    }

    #[tokio::test]
    async fn recording_a_failed_download_is_rejected() {
        let fx = Fixture::new();
        let archive = fx.archive("foo", b"zip");
        let mut store = fx.load().await;

        let failed = DownloadResult::error(
            DownloadTask {
                url: "https://example.com/bar.zip".into(),
                dest: fx.root.join("bar.zip"),
                key: ModFileKey::new(GAME, "bar", ModFileId(3)),
                expected_size: None,
            },
            SyncError::DownloadFailed {
                url: "https://example.com/bar.zip".into(),
                status: 404,
            },
        );

        let err = store
            .record_downloads(&[download_ok(&archive, "foo", 10), failed])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::UnrecordableDownload { ref mod_name, .. } if mod_name == "bar"));
        // nothing from the batch was applied
        assert!(store.managed_mod(GAME, "foo").is_none());
    }

    #[tokio::test]
    async fn installation_requires_known_download() {
        let fx = Fixture::new();
        let installed = fx.installed_dir("Foo");
        let mut store = fx.load().await;

        let err = store
            .record_installations(&[install_ok(&fx.root.join("x.zip"), "foo", 10, vec![installed])])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::UnknownManagedMod { .. }));
    }

    #[tokio::test]
    async fn recording_a_failed_installation_is_rejected() {
        let fx = Fixture::new();
        let archive = fx.archive("foo", b"zip");
        let mut store = fx.load().await;
        store.record_downloads(&[download_ok(&archive, "foo", 10)]).await.unwrap();

        let failed = InstallationResult::fail(
            InstallationTask {
                archive,
                key: ModFileKey::new(GAME, "foo", ModFileId(10)),
            },
            InstallFailReason::NoPalletFound,
        );
        let err = store.record_installations(&[failed]).await.unwrap_err();
        assert!(matches!(err, SyncError::UnrecordableInstallation { .. }));
    }

    #[tokio::test]
    async fn install_tasks_follow_downloads() {
        let fx = Fixture::new();
        let done = fx.archive("done", b"done");
        let pending = fx.archive("pending", b"pending");
        let stale = fx.archive("stale", b"stale");
        let installed = fx.installed_dir("Done");
        let mut store = fx.load().await;

        store
            .record_downloads(&[
                download_ok(&done, "done", 1),
                download_ok(&pending, "pending", 2),
                download_ok(&stale, "stale", 3),
            ])
            .await
            .unwrap();
        store
            .record_installations(&[install_ok(&done, "done", 1, vec![installed])])
            .await
            .unwrap();

        let mods = vec![
            subscribed("done", 1),
            subscribed("pending", 2),
            // live file moved on: the recorded archive is not the one to install
            subscribed("stale", 30),
            subscribed("never-downloaded", 4),
        ];
        let tasks = store.compute_install_tasks(&game(), &mods, TargetPlatform::Windows);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].key, ModFileKey::new(GAME, "pending", ModFileId(2)));
        assert_eq!(tasks[0].archive, pending);
        assert!(store
            .compute_install_tasks(&game(), &mods, TargetPlatform::Oculus)
            .is_empty());
    }

    #[tokio::test]
    async fn prune_deletes_unsubscribed_files() {
        let fx = Fixture::new();
        let keep_archive = fx.archive("keep", b"keep");
        let gone_archive = fx.archive("gone", b"gone");
        let p1 = fx.installed_dir("GoneA");
        let p2 = fx.installed_dir("GoneB");
        let mut store = fx.load().await;

        store
            .record_downloads(&[download_ok(&keep_archive, "keep", 1), download_ok(&gone_archive, "gone", 2)])
            .await
            .unwrap();
        store
            .record_installations(&[install_ok(&gone_archive, "gone", 2, vec![p1.clone(), p2.clone()])])
            .await
            .unwrap();

        let removed = store
            .prune_unsubscribed(GAME, &[subscribed("keep", 1)])
            .await
            .unwrap();

        assert_eq!(removed.into_iter().collect::<Vec<_>>(), vec!["gone".to_string()]);
        assert!(!p1.exists());
        assert!(!p2.exists());
        assert!(!gone_archive.exists());
        assert!(keep_archive.exists());

        let persisted = std::fs::read_to_string(&fx.storage_path).unwrap();
        assert!(!persisted.contains("\"gone\""));
        assert!(persisted.contains("\"keep\""));
    }

    #[tokio::test]
    async fn update_replaces_old_archive_and_install() {
        let fx = Fixture::new();
        let v1 = fx.archive("foo", b"v1");
        let v1_dir = fx.installed_dir("FooV1");
        let mut store = fx.load().await;
        store.record_downloads(&[download_ok(&v1, "foo", 10)]).await.unwrap();
        store
            .record_installations(&[install_ok(&v1, "foo", 10, vec![v1_dir.clone()])])
            .await
            .unwrap();

        let v2 = v1.with_file_name("foo_v2.zip");
        std::fs::write(&v2, b"v2").unwrap();
        let v2_dir = fx.installed_dir("FooV2");
        store.record_downloads(&[download_ok(&v2, "foo", 11)]).await.unwrap();
        store
            .record_installations(&[install_ok(&v2, "foo", 11, vec![v2_dir.clone()])])
            .await
            .unwrap();

        assert!(!v1.exists());
        assert!(!v1_dir.exists());
        assert!(v2.is_file());
        assert!(v2_dir.is_dir());
        let managed = store.managed_mod(GAME, "foo").unwrap();
        assert_eq!(managed.downloaded_mod.as_ref().unwrap().file_path, v2);

        let removed = store.prune_unsubscribed(GAME, &[]).await.unwrap();
        assert_eq!(removed.into_iter().collect::<Vec<_>>(), vec!["foo".to_string()]);
        assert!(!v2.exists());
        assert!(!v2_dir.exists());
        assert!(v1.parent().unwrap().read_dir().unwrap().next().is_none());
    }

    #[tokio::test]
    async fn reinstall_keeps_paths_that_are_still_installed() {
        let fx = Fixture::new();
        let archive = fx.archive("foo", b"v1");
        let shared = fx.installed_dir("Shared");
        let dropped = fx.installed_dir("Dropped");
        let mut store = fx.load().await;
        store.record_downloads(&[download_ok(&archive, "foo", 10)]).await.unwrap();
        store
            .record_installations(&[install_ok(&archive, "foo", 10, vec![shared.clone(), dropped.clone()])])
            .await
            .unwrap();

        // Same archive re-recorded: nothing to delete.
        store.record_downloads(&[download_ok(&archive, "foo", 10)]).await.unwrap();
        store
            .record_installations(&[install_ok(&archive, "foo", 10, vec![shared.clone()])])
            .await
            .unwrap();

        assert!(archive.is_file());
        assert!(shared.is_dir());
        assert!(!dropped.exists());
    }

    #[tokio::test]
    async fn prune_of_unknown_game_is_noop() {
        let fx = Fixture::new();
        let mut store = fx.load().await;
        let removed = store.prune_unsubscribed("other", &[]).await.unwrap();
        assert!(removed.is_empty());
    }

    #[tokio::test]
    async fn load_migrates_legacy_document() {
        let fx = Fixture::new();
        let archive = fx.archive("foo", b"legacy");
        let legacy = serde_json::json!({
            "games": {
                "game": {
                    "foo": {
                        "mod_file_id": 10,
                        "file_path": archive,
                        "file_hash": md5_file(&archive).unwrap()
                    }
                }
            }
        });
        std::fs::write(&fx.storage_path, legacy.to_string()).unwrap();

        let store = fx.load().await;
        assert!(!store.needs_download(GAME, "foo", ModFileId(10)));
        let persisted = std::fs::read_to_string(&fx.storage_path).unwrap();
        assert!(persisted.contains("\"version\": 1"));
        assert!(persisted.contains("downloaded_mod"));
    }
}
