use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::SyncError;

/// Target platforms a mod file can be published for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    Windows,
    Mac,
    Linux,
    Android,
    Ios,
    XboxOne,
    XboxSeriesX,
    Ps4,
    Ps5,
    Switch,
    /// Standalone Quest headsets.
    Oculus,
}

impl TargetPlatform {
    pub const ALL: [TargetPlatform; 11] = [
        TargetPlatform::Windows,
        TargetPlatform::Mac,
        TargetPlatform::Linux,
        TargetPlatform::Android,
        TargetPlatform::Ios,
        TargetPlatform::XboxOne,
        TargetPlatform::XboxSeriesX,
        TargetPlatform::Ps4,
        TargetPlatform::Ps5,
        TargetPlatform::Switch,
        TargetPlatform::Oculus,
    ];

    /// Wire value, as used by the API and in generated filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlatform::Windows => "windows",
            TargetPlatform::Mac => "mac",
            TargetPlatform::Linux => "linux",
            TargetPlatform::Android => "android",
            TargetPlatform::Ios => "ios",
            TargetPlatform::XboxOne => "xboxone",
            TargetPlatform::XboxSeriesX => "xboxseriesx",
            TargetPlatform::Ps4 => "ps4",
            TargetPlatform::Ps5 => "ps5",
            TargetPlatform::Switch => "switch",
            TargetPlatform::Oculus => "oculus",
        }
    }
}

impl std::fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetPlatform {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        TargetPlatform::ALL
            .into_iter()
            .find(|p| p.as_str() == needle)
            .ok_or_else(|| SyncError::Config(format!("Unknown platform: {s}")))
    }
}
