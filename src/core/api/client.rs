// ─── REST API client ───
// Thin typed wrapper over the mod platform's v1 REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::response::PaginatedResponse;
use super::ModSource;
use crate::core::error::{SyncError, SyncResult};
use crate::core::model::{Game, GameId, Mod, ModFile, ModFileId, ModId, TargetPlatform};

const PLATFORM_HEADER: &str = "X-Modio-Platform";

/// How a request is authorised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    /// `api_key` query parameter; enough for public reads.
    ApiKey,
    /// Bearer token; required for user-scoped endpoints.
    OAuth,
}

pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    oauth_token: String,
}

impl ApiClient {
    pub fn new(
        client: Client,
        api_url: &str,
        api_key: impl Into<String>,
        oauth_token: impl Into<String>,
    ) -> SyncResult<Self> {
        // Url::join drops the last path segment unless the base ends with '/'.
        let normalized = if api_url.ends_with('/') {
            api_url.to_string()
        } else {
            format!("{api_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| SyncError::InvalidUrl {
            url: api_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            oauth_token: oauth_token.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &str) -> SyncResult<Url> {
        self.base_url
            .join(endpoint)
            .map_err(|e| SyncError::InvalidUrl {
                url: format!("{}{}", self.base_url, endpoint),
                reason: e.to_string(),
            })
    }

    fn request(
        &self,
        endpoint: &str,
        auth: Auth,
        platform: Option<TargetPlatform>,
    ) -> SyncResult<RequestBuilder> {
        let mut builder = self.client.get(self.endpoint_url(endpoint)?);
        builder = match auth {
            Auth::ApiKey => builder.query(&[("api_key", self.api_key.as_str())]),
            Auth::OAuth => builder.bearer_auth(&self.oauth_token),
        };
        if let Some(platform) = platform {
            builder = builder.header(PLATFORM_HEADER, platform.as_str());
        }
        Ok(builder)
    }

    async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> SyncResult<T> {
        let value = builder.send().await?.error_for_status()?.json().await?;
        Ok(value)
    }

    /// Follow `_offset` pagination until the listing is exhausted.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        auth: Auth,
        platform: Option<TargetPlatform>,
        filters: &[(&str, String)],
    ) -> SyncResult<Vec<T>> {
        let mut items = Vec::new();
        let mut offset = Some(0_u64);

        while let Some(current) = offset {
            let builder = self
                .request(endpoint, auth, platform)?
                .query(filters)
                .query(&[("_offset", current)]);
            let page: PaginatedResponse<T> = Self::fetch(builder).await?;
            debug!(
                "{}: page at offset {} returned {} of {} item(s)",
                endpoint, page.result_offset, page.result_count, page.result_total
            );
            offset = page.next_offset();
            items.extend(page.data);
        }

        Ok(items)
    }

    // ── Endpoints ───────────────────────────────────────

    pub async fn get_games(&self) -> SyncResult<Vec<Game>> {
        self.fetch_all("games", Auth::ApiKey, None, &[]).await
    }

    pub async fn get_game_by_id(&self, game_id: GameId) -> SyncResult<Game> {
        let builder = self.request(&format!("games/{game_id}"), Auth::ApiKey, None)?;
        Self::fetch(builder).await
    }

    pub async fn get_game_mods(&self, game_id: GameId) -> SyncResult<Vec<Mod>> {
        self.fetch_all(&format!("games/{game_id}/mods"), Auth::ApiKey, None, &[])
            .await
    }

    /// Mods the token's owner is subscribed to, optionally restricted to one game.
    pub async fn get_mod_subscriptions(
        &self,
        game_id: Option<GameId>,
        platform: Option<TargetPlatform>,
    ) -> SyncResult<Vec<Mod>> {
        let filters: Vec<(&str, String)> = game_id
            .map(|id| vec![("game_id", id.to_string())])
            .unwrap_or_default();
        self.fetch_all("me/subscribed", Auth::OAuth, platform, &filters)
            .await
    }

    pub async fn get_mod_files(&self, game_id: GameId, mod_id: ModId) -> SyncResult<Vec<ModFile>> {
        self.fetch_all(
            &format!("games/{game_id}/mods/{mod_id}/files"),
            Auth::ApiKey,
            None,
            &[],
        )
        .await
    }

    pub async fn get_mod_file_by_id(
        &self,
        game_id: GameId,
        mod_id: ModId,
        mod_file_id: ModFileId,
    ) -> SyncResult<ModFile> {
        let builder = self.request(
            &format!("games/{game_id}/mods/{mod_id}/files/{mod_file_id}"),
            Auth::ApiKey,
            None,
        )?;
        Self::fetch(builder).await
    }
}

#[async_trait]
impl ModSource for ApiClient {
    async fn resolve_game_by_name_id(&self, name_id: &str) -> SyncResult<Game> {
        let games: Vec<Game> = self
            .fetch_all("games", Auth::ApiKey, None, &[("name_id", name_id.to_string())])
            .await?;
        let mut matches: Vec<Game> = games
            .into_iter()
            .filter(|g| g.matches_name_id(name_id))
            .collect();

        match matches.len() {
            0 => Err(SyncError::GameNotFound(name_id.to_string())),
            1 => {
                let game = matches.remove(0);
                info!("Resolved game {} -> id {}", name_id, game.id);
                Ok(game)
            }
            count => Err(SyncError::AmbiguousGame {
                name_id: name_id.to_string(),
                count,
            }),
        }
    }

    async fn list_subscribed_mods(
        &self,
        game_id: GameId,
        platform: TargetPlatform,
    ) -> SyncResult<Vec<Mod>> {
        let mods = self.get_mod_subscriptions(Some(game_id), Some(platform)).await?;
        // The endpoint filter is advisory on some deployments.
        Ok(mods.into_iter().filter(|m| m.game_id == game_id).collect())
    }

    async fn get_mod_file(
        &self,
        game_id: GameId,
        mod_id: ModId,
        mod_file_id: ModFileId,
    ) -> SyncResult<ModFile> {
        self.get_mod_file_by_id(game_id, mod_id, mod_file_id).await
    }
}
