pub mod client;
pub mod response;

use async_trait::async_trait;

use crate::core::error::SyncResult;
use crate::core::model::{Game, GameId, Mod, ModFile, ModFileId, ModId, TargetPlatform};

pub use client::ApiClient;
pub use response::PaginatedResponse;

/// Remote catalogue the synchronizer reads from.
#[async_trait]
pub trait ModSource: Send + Sync {
    /// The single game whose slug is `name_id`. Zero or several matches are errors.
    async fn resolve_game_by_name_id(&self, name_id: &str) -> SyncResult<Game>;

    /// Every mod of `game_id` the user is subscribed to, as seen from `platform`.
    async fn list_subscribed_mods(
        &self,
        game_id: GameId,
        platform: TargetPlatform,
    ) -> SyncResult<Vec<Mod>>;

    async fn get_mod_file(
        &self,
        game_id: GameId,
        mod_id: ModId,
        mod_file_id: ModFileId,
    ) -> SyncResult<ModFile>;
}
