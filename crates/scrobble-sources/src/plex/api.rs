use crate::error::{ensure_success, SourceError};
use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub(crate) const SERVICE: &str = "Plex";
const CLIENT_IDENTIFIER: &str = "malscrobbler";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub machine_identifier: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    #[serde(rename = "ratingKey", default)]
    rating_key: Option<String>,
    #[serde(rename = "type", default)]
    type_: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<MetadataEntry>,
    #[serde(rename = "Directory", default)]
    directory: Vec<MetadataEntry>,
    #[serde(rename = "machineIdentifier", default)]
    machine_identifier: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlexResponse {
    #[serde(rename = "MediaContainer")]
    media_container: MediaContainer,
}

pub struct PlexHttpClient {
    client: Client,
    server_url: String,
}

impl PlexHttpClient {
    pub fn new(token: &str, server_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-token"),
                    reqwest::header::HeaderValue::from_str(token)
                        .context("Invalid token format")?,
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-client-identifier"),
                    reqwest::header::HeaderValue::from_static(CLIENT_IDENTIFIER),
                );
                headers
            })
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Check that the server is reachable and accepts the token
    pub async fn identity(&self) -> Result<ServerIdentity, SourceError> {
        let url = format!("{}/identity", self.server_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach Plex server")?;
        let response = ensure_success(SERVICE, "server identity", response).await?;

        let body: PlexResponse = response
            .json()
            .await
            .context("Failed to parse Plex identity response")?;

        Ok(ServerIdentity {
            machine_identifier: body.media_container.machine_identifier.unwrap_or_default(),
            version: body.media_container.version.unwrap_or_default(),
        })
    }

    /// Summary text of a library item (seasons carry it in either `Metadata` or `Directory`)
    pub async fn get_summary(&self, rating_key: &str) -> Result<Option<String>, SourceError> {
        let url = format!("{}/library/metadata/{}", self.server_url, rating_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch Plex metadata for {}", rating_key))?;
        let response =
            ensure_success(SERVICE, &format!("metadata item {}", rating_key), response).await?;

        let body: PlexResponse = response
            .json()
            .await
            .context("Failed to parse Plex metadata response")?;

        let container = body.media_container;
        let entry = container
            .metadata
            .into_iter()
            .chain(container.directory)
            .next()
            .ok_or_else(|| SourceError::NotFound {
                service: SERVICE,
                what: format!("metadata item {}", rating_key),
            })?;

        debug!(
            rating_key = entry.rating_key.as_deref().unwrap_or(rating_key),
            item_type = entry.type_.as_deref().unwrap_or("unknown"),
            title = entry.title.as_deref().unwrap_or(""),
            "Fetched Plex metadata item"
        );

        Ok(entry.summary)
    }
}
