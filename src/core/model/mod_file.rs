use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{flag, ModFileId, ModId};
use super::platform::TargetPlatform;

/// Result of the platform's virus scan, sent as an integer code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8", into = "u8")]
pub enum VirusStatus {
    NotScanned,
    ScanComplete,
    InProgress,
    TooLarge,
    FileNotFound,
    ScanError,
}

impl TryFrom<u8> for VirusStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => VirusStatus::NotScanned,
            1 => VirusStatus::ScanComplete,
            2 => VirusStatus::InProgress,
            3 => VirusStatus::TooLarge,
            4 => VirusStatus::FileNotFound,
            5 => VirusStatus::ScanError,
            other => return Err(format!("unknown virus status {other}")),
        })
    }
}

impl From<VirusStatus> for u8 {
    fn from(value: VirusStatus) -> Self {
        match value {
            VirusStatus::NotScanned => 0,
            VirusStatus::ScanComplete => 1,
            VirusStatus::InProgress => 2,
            VirusStatus::TooLarge => 3,
            VirusStatus::FileNotFound => 4,
            VirusStatus::ScanError => 5,
        }
    }
}

/// Moderation state of a file on one platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8", into = "u8")]
pub enum ModFilePlatformStatus {
    Pending,
    Approved,
    Denied,
}

impl TryFrom<u8> for ModFilePlatformStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ModFilePlatformStatus::Pending,
            1 => ModFilePlatformStatus::Approved,
            2 => ModFilePlatformStatus::Denied,
            other => return Err(format!("unknown platform status {other}")),
        })
    }
}

impl From<ModFilePlatformStatus> for u8 {
    fn from(value: ModFilePlatformStatus) -> Self {
        match value {
            ModFilePlatformStatus::Pending => 0,
            ModFilePlatformStatus::Approved => 1,
            ModFilePlatformStatus::Denied => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModFilePlatform {
    pub platform: TargetPlatform,
    pub status: ModFilePlatformStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileHash {
    #[serde(default)]
    pub md5: Option<String>,
}

/// Time-limited binary location for a mod file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Download {
    pub binary_url: String,
    /// Unix timestamp after which `binary_url` stops working.
    pub date_expires: i64,
}

impl Download {
    /// `None` when the API sent no usable expiry.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.date_expires <= 0 {
            return None;
        }
        Utc.timestamp_opt(self.date_expires, 0).single()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|at| at <= now).unwrap_or(false)
    }
}

/// One uploaded build of a mod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModFile {
    pub id: ModFileId,
    pub mod_id: ModId,
    pub filename: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Size in bytes.
    pub filesize: u64,
    #[serde(default)]
    pub filehash: FileHash,
    pub virus_status: VirusStatus,
    #[serde(deserialize_with = "flag")]
    pub virus_positive: bool,
    pub download: Download,
    #[serde(default)]
    pub platforms: Vec<ModFilePlatform>,
}

impl ModFile {
    pub fn supports_platform(&self, platform: TargetPlatform) -> bool {
        self.platforms.iter().any(|p| p.platform == platform)
    }

    /// Files flagged by the virus scan are never downloaded or installed.
    pub fn is_installable(&self) -> bool {
        !self.virus_positive
    }

    pub fn is_scanned(&self) -> bool {
        self.virus_status == VirusStatus::ScanComplete
    }

    /// Every extension of the uploaded filename, e.g. `.tar.gz`.
    pub fn archive_suffixes(&self) -> String {
        let name = self.filename.rsplit(['/', '\\']).next().unwrap_or_default();
        let name = name.trim_start_matches('.');
        match name.find('.') {
            Some(idx) => name[idx..].to_string(),
            None => String::new(),
        }
    }
}
