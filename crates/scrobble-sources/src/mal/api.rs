use crate::error::{ensure_success, SourceError};
use anyhow::{anyhow, Context};
use reqwest::Client;
use scrobble_models::{EntryDate, EntryUpdate, ListEntry, ListStatus};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub(crate) const SERVICE: &str = "MyAnimeList";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ANIME_FIELDS: &str =
    "title,num_episodes,my_list_status{status,score,num_episodes_watched,is_rewatching,start_date,finish_date,tags}";

#[derive(Debug, Clone, Deserialize)]
pub struct MalUser {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct AnimeDetails {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    num_episodes: u32,
    #[serde(default)]
    my_list_status: Option<MyListStatus>,
}

#[derive(Debug, Deserialize)]
struct MyListStatus {
    status: String,
    #[serde(default)]
    score: u8,
    #[serde(default)]
    num_episodes_watched: u32,
    #[serde(default)]
    is_rewatching: bool,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    finish_date: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl AnimeDetails {
    fn into_list_entry(self) -> anyhow::Result<Option<ListEntry>> {
        let Some(list_status) = self.my_list_status else {
            return Ok(None);
        };

        let status: ListStatus = list_status
            .status
            .parse()
            .map_err(|e: String| anyhow!(e))?;
        let start_date = parse_date(list_status.start_date.as_deref())?;
        let finish_date = parse_date(list_status.finish_date.as_deref())?;

        Ok(Some(ListEntry {
            catalog_id: self.id,
            title: self.title,
            watched_episodes: list_status.num_episodes_watched,
            total_episodes: self.num_episodes,
            status,
            rewatching: list_status.is_rewatching,
            score: list_status.score,
            tags: list_status.tags,
            start_date,
            finish_date,
        }))
    }
}

fn parse_date(raw: Option<&str>) -> anyhow::Result<EntryDate> {
    match raw {
        None => Ok(EntryDate::Unset),
        Some(raw) => EntryDate::parse(raw).map_err(|e| anyhow!(e)),
    }
}

/// Form body for `PATCH /anime/{id}/my_list_status`. Dates are only sent when they change.
pub fn update_form(update: &EntryUpdate) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("status", update.status.as_api_str().to_string()),
        ("is_rewatching", update.rewatching.to_string()),
        ("score", update.score.to_string()),
        ("num_watched_episodes", update.watched_episodes.to_string()),
        ("tags", update.tags.join(",")),
    ];
    if let Some(date) = update.start_date {
        form.push(("start_date", EntryDate::Set(date).to_string()));
    }
    if let Some(date) = update.finish_date {
        form.push(("finish_date", EntryDate::Set(date).to_string()));
    }
    form
}

pub struct MalHttpClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl MalHttpClient {
    pub fn new(base_url: &str, access_token: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    pub async fn get_me(&self) -> Result<MalUser, SourceError> {
        let url = format!("{}/users/@me", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to reach MyAnimeList")?;
        let response = ensure_success(SERVICE, "user", response).await?;

        let user: MalUser = response
            .json()
            .await
            .context("Failed to parse MyAnimeList user response")?;
        Ok(user)
    }

    /// The viewer's list entry for an anime, `None` when the anime is not on the list
    pub async fn get_list_entry(&self, anime_id: u64) -> Result<Option<ListEntry>, SourceError> {
        let url = format!("{}/anime/{}", self.base_url, anime_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", ANIME_FIELDS)])
            .send()
            .await
            .with_context(|| format!("Failed to fetch MyAnimeList anime {}", anime_id))?;

        let response = match ensure_success(SERVICE, &format!("anime {}", anime_id), response).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let details: AnimeDetails = response
            .json()
            .await
            .context("Failed to parse MyAnimeList anime response")?;
        debug!(
            anime_id,
            title = %details.title,
            on_list = details.my_list_status.is_some(),
            "Fetched MyAnimeList anime"
        );

        Ok(details.into_list_entry()?)
    }

    pub async fn update_list_status(&self, anime_id: u64, update: &EntryUpdate) -> Result<(), SourceError> {
        let url = format!("{}/anime/{}/my_list_status", self.base_url, anime_id);
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.access_token)
            .form(&update_form(update))
            .send()
            .await
            .with_context(|| format!("Failed to update MyAnimeList anime {}", anime_id))?;
        ensure_success(SERVICE, &format!("anime {}", anime_id), response).await?;
        Ok(())
    }
}
