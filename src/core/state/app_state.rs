use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;

use crate::core::api::ApiClient;
use crate::core::config::SyncConfig;
use crate::core::downloader::Downloader;
use crate::core::error::{SyncError, SyncResult};
use crate::core::http::build_http_client;
use crate::core::installer::{ModInstaller, PlatformKeywords};
use crate::core::storage::ModStorage;
use crate::core::sync::ModSynchronizer;

const APP_DIR_NAME: &str = "ModSync";
const STORAGE_FILE: &str = "storage.json";
const LOGS_DIR_NAME: &str = "logs";

/// Everything one run needs, built once from the config and passed down
/// explicitly.
pub struct AppContext {
    pub config: SyncConfig,
    pub data_dir: PathBuf,
    pub http_client: Client,
}

impl AppContext {
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        let data_dir = resolve_data_dir(&config);
        std::fs::create_dir_all(&data_dir).map_err(|e| SyncError::io(&data_dir, e))?;

        let http_client = build_http_client()?;

        Ok(Self {
            config,
            data_dir,
            http_client,
        })
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }

    pub fn extractions_dir(&self) -> PathBuf {
        self.data_dir.join("extractions")
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(STORAGE_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        logs_dir_in(&self.data_dir)
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.config.mods_dir.clone()
    }

    pub fn api_client(&self) -> SyncResult<ApiClient> {
        ApiClient::new(
            self.http_client.clone(),
            &self.config.api_url,
            self.config.api_key.clone(),
            self.config.oauth_token.clone(),
        )
    }

    pub fn downloader(&self) -> Downloader {
        Downloader::new(self.http_client.clone())
            .with_concurrency(self.config.max_concurrent_downloads)
            .with_max_file_size(self.config.max_file_size_bytes)
            .with_stall_timeout(Duration::from_secs(self.config.stall_timeout_secs))
    }

    pub fn installer(&self) -> ModInstaller {
        let installer = ModInstaller::new(self.extractions_dir(), self.mods_dir())
            .with_keywords(PlatformKeywords::for_platform(self.config.platform))
            .with_policy(self.config.selection_policy);
        match self.config.install_workers {
            Some(workers) => installer.with_workers(workers),
            None => installer,
        }
    }

    pub async fn open_storage(&self) -> SyncResult<ModStorage> {
        ModStorage::load(self.storage_path()).await
    }

    pub fn synchronizer(&self) -> SyncResult<ModSynchronizer<ApiClient>> {
        std::fs::create_dir_all(self.mods_dir()).map_err(|e| SyncError::io(self.mods_dir(), e))?;
        Ok(ModSynchronizer::new(
            self.api_client()?,
            self.downloader(),
            self.installer(),
            self.downloads_dir(),
            self.config.platform,
        ))
    }
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_data_dir() -> PathBuf {
    default_base_dir().join(APP_DIR_NAME)
}

/// The configured data directory, or the per-user default.
pub fn resolve_data_dir(config: &SyncConfig) -> PathBuf {
    config.data_dir.clone().unwrap_or_else(default_data_dir)
}

pub fn logs_dir_in(data_dir: &Path) -> PathBuf {
    data_dir.join(LOGS_DIR_NAME)
}
