use crate::error::ScrobbleError;
use scrobble_models::SeasonMetadata;
use scrobble_sources::MetadataStore;
use std::sync::Arc;
use tracing::debug;

/// Maps a season to its catalog id and episode offset. Fetches on every call.
pub struct MetadataResolver {
    store: Arc<dyn MetadataStore>,
}

impl MetadataResolver {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, season_id: &str) -> Result<SeasonMetadata, ScrobbleError> {
        let summary = self
            .store
            .season_summary(season_id)
            .await
            .map_err(|source| ScrobbleError::Lookup {
                what: format!("{} season {}", self.store.store_name(), season_id),
                source,
            })?;

        let metadata = parse_season_metadata(season_id, summary.as_deref())?;
        debug!(
            season_id,
            catalog_id = metadata.catalog_id,
            first_episode = metadata.first_episode,
            "Resolved season metadata"
        );
        Ok(metadata)
    }
}

/// Decode the JSON blob stored in a season's summary
pub fn parse_season_metadata(season_id: &str, summary: Option<&str>) -> Result<SeasonMetadata, ScrobbleError> {
    let format_error = |reason: String| ScrobbleError::MetadataFormat {
        season_id: season_id.to_string(),
        reason,
    };

    let raw = summary
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format_error("summary is empty".to_string()))?;

    let metadata: SeasonMetadata =
        serde_json::from_str(raw).map_err(|e| format_error(format!("invalid JSON: {}", e)))?;

    if metadata.catalog_id == 0 {
        return Err(format_error("myAnimeListID must be positive".to_string()));
    }
    if metadata.first_episode < 1 {
        return Err(format_error(format!(
            "firstEpisode must be at least 1, got {}",
            metadata.first_episode
        )));
    }

    Ok(metadata)
}
