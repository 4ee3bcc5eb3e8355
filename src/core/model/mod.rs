pub mod game;
pub mod ids;
pub mod mod_file;
pub mod mods;
pub mod platform;

pub use game::Game;
pub use ids::{GameId, ModFileId, ModId};
pub use mod_file::{
    Download, FileHash, ModFile, ModFilePlatform, ModFilePlatformStatus, VirusStatus,
};
pub use mods::{Mod, ModPlatform};
pub use platform::TargetPlatform;

/// Back-reference from a transient task to the game/mod/file it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModFileKey {
    pub game_name_id: String,
    pub mod_name_id: String,
    pub mod_file_id: ModFileId,
}

impl ModFileKey {
    pub fn new(
        game_name_id: impl Into<String>,
        mod_name_id: impl Into<String>,
        mod_file_id: ModFileId,
    ) -> Self {
        Self {
            game_name_id: game_name_id.into(),
            mod_name_id: mod_name_id.into(),
            mod_file_id,
        }
    }
}

impl std::fmt::Display for ModFileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}#{}",
            self.game_name_id, self.mod_name_id, self.mod_file_id
        )
    }
}
