//! Plex webhook payloads.
//!
//! Plex posts `multipart/form-data` with the JSON document in a `payload` part
//! (and a thumbnail part for some events). Only the fields needed to scrobble
//! an episode are modelled here.

use scrobble_models::PlaybackCompletionEvent;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    /// Playback passed the "watched" threshold
    Scrobble,
    Pause,
    Other(String),
}

impl From<&str> for WebhookEventKind {
    fn from(event: &str) -> Self {
        match event {
            "media.scrobble" => WebhookEventKind::Scrobble,
            "media.pause" => WebhookEventKind::Pause,
            other => WebhookEventKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlexWebhook {
    pub event: String,
    #[serde(rename = "Account", default)]
    pub account: Option<WebhookAccount>,
    #[serde(rename = "Server", default)]
    pub server: Option<WebhookServer>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<WebhookMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookAccount {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookServer {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMetadata {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parent_title: String,
    #[serde(default)]
    pub grandparent_title: String,
    #[serde(default)]
    pub parent_rating_key: Option<String>,
    #[serde(default)]
    pub index: Option<i32>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
    #[error("webhook has no metadata")]
    MissingMetadata,
    #[error("webhook is for a {0}, not an episode")]
    NotAnEpisode(String),
    #[error("webhook metadata is missing {0}")]
    MissingField(&'static str),
}

impl PlexWebhook {
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    pub fn kind(&self) -> WebhookEventKind {
        WebhookEventKind::from(self.event.as_str())
    }

    pub fn viewer(&self) -> &str {
        self.account.as_ref().map(|a| a.title.as_str()).unwrap_or("")
    }

    /// Build the playback event for an episode webhook
    pub fn to_completion_event(&self) -> Result<PlaybackCompletionEvent, WebhookError> {
        let metadata = self.metadata.as_ref().ok_or(WebhookError::MissingMetadata)?;

        if metadata.type_ != "episode" {
            return Err(WebhookError::NotAnEpisode(metadata.type_.clone()));
        }

        let season_id = metadata
            .parent_rating_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(WebhookError::MissingField("parentRatingKey"))?;
        let local_index = metadata.index.ok_or(WebhookError::MissingField("index"))?;

        Ok(PlaybackCompletionEvent {
            viewer: self.viewer().to_string(),
            server: self
                .server
                .as_ref()
                .map(|s| s.title.clone())
                .unwrap_or_default(),
            season_id,
            series_title: metadata.grandparent_title.clone(),
            season_title: metadata.parent_title.clone(),
            episode_title: metadata.title.clone(),
            local_index,
        })
    }
}
