use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::downloader::DEFAULT_MAX_FILE_SIZE;
use crate::core::error::{SyncError, SyncResult};
use crate::core::installer::SelectionPolicy;
use crate::core::model::TargetPlatform;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// User configuration, read from `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub api_url: String,
    pub api_key: String,
    pub oauth_token: String,
    /// Slug of the game to sync.
    pub game: String,
    #[serde(default = "default_platform")]
    pub platform: TargetPlatform,
    /// Where selected content folders are copied to.
    pub mods_dir: PathBuf,
    /// Downloads, scratch space, storage and logs. Defaults to the OS data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
    /// Parallel install workers; `None` means one per CPU.
    #[serde(default)]
    pub install_workers: Option<usize>,
    #[serde(default)]
    pub selection_policy: SelectionPolicy,
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    #[serde(default = "default_stall_timeout_secs")]
    pub stall_timeout_secs: u64,
}

fn default_platform() -> TargetPlatform {
    TargetPlatform::Windows
}

fn default_max_concurrent_downloads() -> usize {
    8
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_stall_timeout_secs() -> u64 {
    60
}

impl SyncConfig {
    pub fn load(path: &Path) -> SyncResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let config = Self::from_json(&raw)?;
        debug!("Loaded config from {:?} (game={}, platform={})", path, config.game, config.platform);
        Ok(config)
    }

    pub fn from_json(raw: &str) -> SyncResult<Self> {
        let config: SyncConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SyncResult<()> {
        let required = [
            ("api_url", self.api_url.as_str()),
            ("api_key", self.api_key.as_str()),
            ("oauth_token", self.oauth_token.as_str()),
            ("game", self.game.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SyncError::Config(format!("`{field}` must not be empty")));
            }
        }
        if self.max_concurrent_downloads == 0 {
            return Err(SyncError::Config(
                "`max_concurrent_downloads` must be at least 1".into(),
            ));
        }
        if self.install_workers == Some(0) {
            return Err(SyncError::Config("`install_workers` must be at least 1".into()));
        }
        Ok(())
    }
}
