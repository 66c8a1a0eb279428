use crate::error::SourceError;
use crate::plex::api::{PlexHttpClient, ServerIdentity};
use crate::traits::MetadataStore;
use async_trait::async_trait;
use scrobble_config::PlexConfig;
use tracing::info;

/// Plex server as the store for season metadata
pub struct PlexClient {
    api: PlexHttpClient,
}

impl PlexClient {
    pub fn new(config: &PlexConfig, token: &str) -> anyhow::Result<Self> {
        let api = PlexHttpClient::new(token, &config.server_url)?;
        Ok(Self { api })
    }

    /// Verify the server is reachable with the configured token
    pub async fn authenticate(&self) -> Result<ServerIdentity, SourceError> {
        let identity = self.api.identity().await?;
        info!(
            server_url = self.api.server_url(),
            machine_identifier = %identity.machine_identifier,
            version = %identity.version,
            "Connected to Plex server"
        );
        Ok(identity)
    }
}

#[async_trait]
impl MetadataStore for PlexClient {
    fn store_name(&self) -> &str {
        "plex"
    }

    async fn season_summary(&self, season_id: &str) -> Result<Option<String>, SourceError> {
        self.api.get_summary(season_id).await
    }
}
