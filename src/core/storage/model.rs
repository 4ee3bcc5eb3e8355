use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::{SyncError, SyncResult};
use crate::core::model::ModFileId;

/// Current on-disk schema. Bump and extend [`Storage::from_value`] on shape changes.
pub const STORAGE_SCHEMA_VERSION: u64 = 1;

/// Archive recorded after a successful download.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadedManagedMod {
    pub mod_file_id: ModFileId,
    pub file_path: PathBuf,
    /// Lowercase hex MD5 of `file_path` at the time it was recorded.
    pub file_hash: String,
}

/// Directories written into the mods folder by a successful install.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledManagedMod {
    pub mod_file_id: ModFileId,
    pub installed_paths: Vec<PathBuf>,
}

/// Local state for one (game, mod) pair. Both halves are optional; an entry with
/// neither is empty and gets dropped on validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagedMod {
    #[serde(default)]
    pub downloaded_mod: Option<DownloadedManagedMod>,
    #[serde(default)]
    pub installed_mod: Option<InstalledManagedMod>,
}

impl ManagedMod {
    pub fn is_empty(&self) -> bool {
        self.downloaded_mod.is_none() && self.installed_mod.is_none()
    }

    pub fn is_downloaded(&self, mod_file_id: ModFileId) -> bool {
        self.downloaded_mod
            .as_ref()
            .is_some_and(|d| d.mod_file_id == mod_file_id)
    }

    pub fn is_installed(&self, mod_file_id: ModFileId) -> bool {
        self.installed_mod
            .as_ref()
            .is_some_and(|i| i.mod_file_id == mod_file_id)
    }
}

/// Managed mods of one game, keyed by mod name id.
pub type StorageGame = BTreeMap<String, ManagedMod>;

/// Whole persisted document, keyed by game name id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Storage {
    pub version: u64,
    #[serde(default)]
    pub games: BTreeMap<String, StorageGame>,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            version: STORAGE_SCHEMA_VERSION,
            games: BTreeMap::new(),
        }
    }
}

impl Storage {
    pub fn get_mod(&self, game_name_id: &str, mod_name_id: &str) -> Option<&ManagedMod> {
        self.games.get(game_name_id)?.get(mod_name_id)
    }

    pub fn get_mod_mut(&mut self, game_name_id: &str, mod_name_id: &str) -> Option<&mut ManagedMod> {
        self.games.get_mut(game_name_id)?.get_mut(mod_name_id)
    }

    /// Entry for the pair, created empty if missing.
    pub fn entry(&mut self, game_name_id: &str, mod_name_id: &str) -> &mut ManagedMod {
        self.games
            .entry(game_name_id.to_string())
            .or_default()
            .entry(mod_name_id.to_string())
            .or_default()
    }

    /// Parse a stored document of any known schema, migrating it to the current one.
    pub fn from_value(value: serde_json::Value) -> SyncResult<Self> {
        let Some(version) = value.get("version") else {
            return migrate_unversioned(value);
        };

        let version = version
            .as_u64()
            .ok_or_else(|| SyncError::Other(format!("Invalid storage version: {version}")))?;
        if version != STORAGE_SCHEMA_VERSION {
            return Err(SyncError::UnsupportedStorageVersion(version));
        }

        Ok(serde_json::from_value(value)?)
    }
}

/// Documents written before the version tag existed. A mod entry is either the
/// flat single-archive record or the two-field managed record.
fn migrate_unversioned(value: serde_json::Value) -> SyncResult<Storage> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LegacyEntry {
        Flat(DownloadedManagedMod),
        Managed(ManagedMod),
    }

    #[derive(Deserialize)]
    struct LegacyStorage {
        #[serde(default)]
        games: BTreeMap<String, BTreeMap<String, LegacyEntry>>,
    }

    let legacy: LegacyStorage = serde_json::from_value(value)?;
    let games = legacy
        .games
        .into_iter()
        .map(|(game, mods)| {
            let mods = mods
                .into_iter()
                .map(|(name, entry)| {
                    let managed = match entry {
                        LegacyEntry::Flat(downloaded) => ManagedMod {
                            downloaded_mod: Some(downloaded),
                            installed_mod: None,
                        },
                        LegacyEntry::Managed(managed) => managed,
                    };
                    (name, managed)
                })
                .collect();
            (game, mods)
        })
        .collect();

    Ok(Storage {
        version: STORAGE_SCHEMA_VERSION,
        games,
    })
}
