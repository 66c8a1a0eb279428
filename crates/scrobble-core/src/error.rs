use scrobble_sources::SourceError;

/// Reasons a single scrobble stops. None of them affect other events.
#[derive(Debug, thiserror::Error)]
pub enum ScrobbleError {
    #[error("failed to look up {what}: {source}")]
    Lookup {
        what: String,
        #[source]
        source: SourceError,
    },

    #[error("season {season_id} has malformed metadata: {reason}")]
    MetadataFormat { season_id: String, reason: String },

    /// `absolute` is `None` when the sum overflows
    #[error("episode index {local_index} with first episode {first_episode} is not a valid episode number")]
    EpisodeNumber {
        local_index: i32,
        first_episode: i64,
        absolute: Option<i64>,
    },

    #[error("no list entry for catalog id {catalog_id}")]
    EntryNotFound { catalog_id: u64 },

    #[error("failed to update list entry {catalog_id}: {source}")]
    Update {
        catalog_id: u64,
        #[source]
        source: SourceError,
    },
}
