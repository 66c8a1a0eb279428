use crate::error::SourceError;
use async_trait::async_trait;
use scrobble_models::{EntryUpdate, ListEntry};

/// Where season metadata blobs live (the Plex season summary)
#[async_trait]
pub trait MetadataStore: Send + Sync {
    fn store_name(&self) -> &str;

    /// Raw free-text field of the season, `None` when the season has no such field
    async fn season_summary(&self, season_id: &str) -> Result<Option<String>, SourceError>;
}

/// The remote watch list holding one entry per series
#[async_trait]
pub trait ListService: Send + Sync {
    fn service_name(&self) -> &str;

    /// Look up the viewer's entry for a catalog id. `Ok(None)` when the series is not on the list.
    async fn get_entry(&self, catalog_id: u64) -> Result<Option<ListEntry>, SourceError>;

    async fn update_entry(&self, catalog_id: u64, update: &EntryUpdate) -> Result<(), SourceError>;
}
