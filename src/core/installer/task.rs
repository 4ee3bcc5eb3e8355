use std::path::PathBuf;

use crate::core::model::ModFileKey;

/// A downloaded archive waiting to be extracted and installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationTask {
    pub archive: PathBuf,
    pub key: ModFileKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallFailReason {
    /// No directory in the archive contains the sentinel manifest.
    NoPalletFound,
    /// Several candidates, and the platform filter rejected all of them.
    NoFilteredPalletFound,
    /// Several candidates, and the platform filter could not narrow them to one.
    TooManyFilteredPalletsFound,
    /// The archive could not be read or its content could not be copied.
    Io(String),
}

impl std::fmt::Display for InstallFailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallFailReason::NoPalletFound => write!(f, "no pallet found"),
            InstallFailReason::NoFilteredPalletFound => {
                write!(f, "no pallet left after platform filtering")
            }
            InstallFailReason::TooManyFilteredPalletsFound => {
                write!(f, "too many pallets left after platform filtering")
            }
            InstallFailReason::Io(message) => write!(f, "io failure: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationOutcome {
    Ok { installed_paths: Vec<PathBuf> },
    Fail { reason: InstallFailReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationResult {
    pub task: InstallationTask,
    pub outcome: InstallationOutcome,
}

impl InstallationResult {
    pub fn ok(task: InstallationTask, installed_paths: Vec<PathBuf>) -> Self {
        Self {
            task,
            outcome: InstallationOutcome::Ok { installed_paths },
        }
    }

    pub fn fail(task: InstallationTask, reason: InstallFailReason) -> Self {
        Self {
            task,
            outcome: InstallationOutcome::Fail { reason },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, InstallationOutcome::Ok { .. })
    }
}
