// ─── Content-folder resolution ───
// An archive may ship several builds of a mod (one per platform). The folder
// to install is the one holding the sentinel manifest; when there are several,
// the path relative to the extraction root is matched against platform keywords.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::task::InstallFailReason;
use crate::core::error::{SyncError, SyncResult};
use crate::core::model::TargetPlatform;

/// Marker file identifying a directory as installable content.
pub const PALLET_FILE: &str = "pallet.json";

const PC_KEYWORDS: [&str; 2] = ["win", "pc"];
const STANDALONE_KEYWORDS: [&str; 3] = ["quest", "oculus", "android"];

/// How several surviving candidates are handled.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Exactly one folder must survive the platform filter.
    #[default]
    Strict,
    /// Install every folder the filter accepts; if any candidate carries no
    /// platform keyword at all, install every candidate.
    AcceptAll,
}

/// Keywords deciding whether a candidate folder targets the current platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformKeywords {
    pub allowed: Vec<String>,
    pub banned: Vec<String>,
}

impl Default for PlatformKeywords {
    fn default() -> Self {
        Self::for_platform(TargetPlatform::Windows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Allowed,
    Banned,
    Neutral,
}

impl PlatformKeywords {
    pub fn for_platform(platform: TargetPlatform) -> Self {
        let (allowed, banned): (&[&str], &[&str]) = match platform {
            TargetPlatform::Android | TargetPlatform::Oculus => (&STANDALONE_KEYWORDS, &PC_KEYWORDS),
            _ => (&PC_KEYWORDS, &STANDALONE_KEYWORDS),
        };
        Self {
            allowed: allowed.iter().map(|k| k.to_string()).collect(),
            banned: banned.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Allowed keywords win over banned ones.
    fn classify(&self, rel_path: &str) -> Verdict {
        let rel_path = rel_path.to_lowercase();
        if self.allowed.iter().any(|k| rel_path.contains(k.as_str())) {
            Verdict::Allowed
        } else if self.banned.iter().any(|k| rel_path.contains(k.as_str())) {
            Verdict::Banned
        } else {
            Verdict::Neutral
        }
    }
}

/// Every directory under `dir` (inclusive) that directly contains [`PALLET_FILE`].
/// A match is not searched further. Children are visited in sorted order.
pub fn locate_content_folders(dir: &Path) -> SyncResult<Vec<PathBuf>> {
    if dir.join(PALLET_FILE).is_file() {
        return Ok(vec![dir.to_path_buf()]);
    }

    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))? {
        let entry = entry.map_err(|e| SyncError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            children.push(path);
        }
    }
    children.sort();

    let mut found = Vec::new();
    for child in children {
        found.extend(locate_content_folders(&child)?);
    }
    Ok(found)
}

/// Pick the folder(s) to install out of `candidates`, all located under `root`.
pub fn select_content_folders(
    root: &Path,
    candidates: Vec<PathBuf>,
    policy: SelectionPolicy,
    keywords: &PlatformKeywords,
) -> Result<Vec<PathBuf>, InstallFailReason> {
    match candidates.len() {
        0 => {
            warn!("Could not locate {} in {:?}", PALLET_FILE, root);
            return Err(InstallFailReason::NoPalletFound);
        }
        1 => return Ok(candidates),
        _ => {}
    }

    let mut allowed = Vec::new();
    let mut banned = Vec::new();
    let mut neutral = Vec::new();
    for candidate in &candidates {
        let rel = candidate
            .strip_prefix(root)
            .unwrap_or(candidate)
            .to_string_lossy()
            .to_string();
        match keywords.classify(&rel) {
            Verdict::Allowed => allowed.push(candidate.clone()),
            Verdict::Banned => banned.push(candidate.clone()),
            Verdict::Neutral => neutral.push(candidate.clone()),
        }
    }
    debug!(
        "Content folders in {:?}: allowed={:?} banned={:?} neutral={:?}",
        root, allowed, banned, neutral
    );

    match policy {
        SelectionPolicy::Strict => {
            let survivors = if allowed.is_empty() { neutral } else { allowed };
            match survivors.len() {
                0 => {
                    warn!("Every content folder in {:?} targets another platform", root);
                    Err(InstallFailReason::NoFilteredPalletFound)
                }
                1 => Ok(survivors),
                _ => {
                    warn!("Cannot choose between content folders {:?}", survivors);
                    Err(InstallFailReason::TooManyFilteredPalletsFound)
                }
            }
        }
        SelectionPolicy::AcceptAll => {
            if !neutral.is_empty() {
                warn!("Couldn't partition content folders for {:?}, accepting all", root);
                Ok(candidates)
            } else if allowed.is_empty() {
                Err(InstallFailReason::NoFilteredPalletFound)
            } else {
                Ok(allowed)
            }
        }
    }
}
