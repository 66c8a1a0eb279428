use crate::error::SourceError;
use crate::mal::api::{MalHttpClient, MalUser};
use crate::mal::auth::{self, TokenInfo};
use crate::traits::ListService;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use scrobble_config::{CredentialStore, MalConfig};
use scrobble_models::{EntryUpdate, ListEntry};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Refresh this long before the stored expiry
const EXPIRY_MARGIN_MINUTES: i64 = 5;

/// Access token currently in use. `generation` increases on every refresh so
/// concurrent callers that saw the same rejected token refresh only once.
struct Session {
    api: Arc<MalHttpClient>,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl Session {
    fn expires_soon(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now() + Duration::minutes(EXPIRY_MARGIN_MINUTES))
    }
}

/// MyAnimeList as the list service.
///
/// The access token is refreshed whenever it is about to expire or gets rejected,
/// and refreshed tokens are written back to the credentials file it was loaded from.
pub struct MalClient {
    config: MalConfig,
    session: RwLock<Session>,
    credentials_path: Option<PathBuf>,
}

impl MalClient {
    /// Client for a bare access token, without refresh support
    pub fn new(config: &MalConfig, access_token: &str) -> Result<Self> {
        Ok(Self {
            session: RwLock::new(Session {
                api: Arc::new(MalHttpClient::new(&config.api_base_url, access_token)?),
                refresh_token: None,
                expires_at: None,
                generation: 0,
            }),
            config: config.clone(),
            credentials_path: None,
        })
    }

    /// Client for the tokens held in `cred_store`; refreshed tokens are saved back to its file
    pub fn from_credentials(config: &MalConfig, cred_store: &CredentialStore) -> Result<Self> {
        let access_token = cred_store
            .get_mal_access_token()
            .ok_or_else(|| anyhow::anyhow!("No MyAnimeList token stored. Run 'malscrobbler config mal' first."))?;

        let mut client = Self::new(config, access_token)?;
        let session = client.session.get_mut();
        session.refresh_token = cred_store.get_mal_refresh_token().cloned();
        session.expires_at = cred_store.get_mal_token_expires();
        client.credentials_path = Some(cred_store.path().to_path_buf());
        Ok(client)
    }

    /// Verify the access token and return the MyAnimeList username
    pub async fn authenticate(&self) -> Result<String> {
        let user: MalUser = self.with_session(|api| async move { api.get_me().await }).await?;
        info!(username = %user.name, "Verified MyAnimeList user");
        Ok(user.name)
    }

    /// Run `call` with the current token, refreshing first when the token is about to
    /// expire and once more (then retrying) when the service rejects it.
    async fn with_session<T, F, Fut>(&self, call: F) -> Result<T, SourceError>
    where
        F: Fn(Arc<MalHttpClient>) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let (api, generation, expires_soon) = {
            let session = self.session.read().await;
            (
                session.api.clone(),
                session.generation,
                session.expires_soon() && session.refresh_token.is_some(),
            )
        };

        let (api, generation) = if expires_soon {
            info!("MyAnimeList token is about to expire, refreshing");
            self.refresh(generation).await?
        } else {
            (api, generation)
        };

        match call(api).await {
            Err(e) if e.is_unauthorized() => {
                warn!("MyAnimeList rejected the access token, attempting refresh");
                let (api, _) = self.refresh(generation).await?;
                call(api).await
            }
            result => result,
        }
    }

    /// Exchange the refresh token unless another caller already replaced token `seen_generation`
    async fn refresh(&self, seen_generation: u64) -> Result<(Arc<MalHttpClient>, u64), SourceError> {
        let mut session = self.session.write().await;
        if session.generation != seen_generation {
            debug!("MyAnimeList token was already refreshed");
            return Ok((session.api.clone(), session.generation));
        }

        let refresh_token = session.refresh_token.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "MyAnimeList token expired and no refresh token is stored. Run 'malscrobbler config mal' first"
            )
        })?;

        let token_info =
            auth::refresh_access_token(&self.config.token_url, &self.config.client_id, &refresh_token).await?;

        session.api = Arc::new(MalHttpClient::new(&self.config.api_base_url, &token_info.access_token)?);
        session.refresh_token = Some(token_info.refresh_token.clone());
        session.expires_at = Some(token_info.expires_at);
        session.generation += 1;

        if let Some(path) = &self.credentials_path {
            match persist_tokens(path, &token_info) {
                Ok(()) => debug!("Saved refreshed MyAnimeList token"),
                Err(e) => warn!(error = %e, "Failed to save refreshed MyAnimeList token"),
            }
        }

        info!(expires_at = %token_info.expires_at, "Refreshed MyAnimeList token");
        Ok((session.api.clone(), session.generation))
    }
}

fn persist_tokens(path: &Path, token_info: &TokenInfo) -> Result<()> {
    let mut cred_store = CredentialStore::new(path.to_path_buf());
    cred_store.load()?;
    cred_store.set_mal_access_token(token_info.access_token.clone());
    cred_store.set_mal_refresh_token(token_info.refresh_token.clone());
    cred_store.set_mal_token_expires(token_info.expires_at);
    cred_store.save()
}

#[async_trait]
impl ListService for MalClient {
    fn service_name(&self) -> &str {
        "myanimelist"
    }

    async fn get_entry(&self, catalog_id: u64) -> Result<Option<ListEntry>, SourceError> {
        self.with_session(|api| async move { api.get_list_entry(catalog_id).await })
            .await
    }

    async fn update_entry(&self, catalog_id: u64, update: &EntryUpdate) -> Result<(), SourceError> {
        self.with_session(|api| async move { api.update_list_status(catalog_id, update).await })
            .await
    }
}
