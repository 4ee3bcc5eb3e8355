use serde::{Deserialize, Serialize};

use super::ids::GameId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    /// URL slug, also used as the storage key for the game.
    pub name_id: String,
}

impl Game {
    pub fn matches_name_id(&self, name_id: &str) -> bool {
        self.name_id == name_id
    }
}
