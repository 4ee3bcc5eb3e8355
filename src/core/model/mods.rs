use serde::{Deserialize, Serialize};

use super::ids::{flag, GameId, ModFileId, ModId};
use super::mod_file::ModFile;
use super::platform::TargetPlatform;

/// The live file of a mod on one platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModPlatform {
    pub platform: TargetPlatform,
    pub modfile_live: ModFileId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mod {
    pub id: ModId,
    pub game_id: GameId,
    pub name: String,
    /// Stable slug, unique per game. Used as the storage key and as a directory name.
    pub name_id: String,
    #[serde(default)]
    pub platforms: Vec<ModPlatform>,
    #[serde(default = "default_visible", deserialize_with = "flag")]
    pub visible: bool,
    /// Primary file as reported by the API, when present.
    #[serde(default)]
    pub modfile: Option<ModFile>,
}

fn default_visible() -> bool {
    true
}

impl Mod {
    pub fn live_mod_file_id(&self, platform: TargetPlatform) -> Option<ModFileId> {
        self.platforms
            .iter()
            .find(|p| p.platform == platform)
            .map(|p| p.modfile_live)
    }

    pub fn supported_platforms(&self) -> Vec<TargetPlatform> {
        self.platforms.iter().map(|p| p.platform).collect()
    }

    /// Whether the mod may be downloaded. Only visibility is checked for now.
    pub fn is_available(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_file_per_platform() {
        let json = r#"{
            "id": 3,
            "game_id": 1,
            "name": "Foo",
            "name_id": "foo",
            "visible": 1,
            "platforms": [
                {"platform": "windows", "modfile_live": 10},
                {"platform": "oculus", "modfile_live": 11}
            ]
        }"#;
        let m: Mod = serde_json::from_str(json).unwrap();
        assert!(m.is_available());
        assert_eq!(m.live_mod_file_id(TargetPlatform::Windows), Some(ModFileId(10)));
        assert_eq!(m.live_mod_file_id(TargetPlatform::Oculus), Some(ModFileId(11)));
        assert_eq!(m.live_mod_file_id(TargetPlatform::Linux), None);
        assert!(m.modfile.is_none());
    }
}
