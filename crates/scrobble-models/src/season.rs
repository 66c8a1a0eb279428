use serde::{Deserialize, Serialize};

/// Mapping stored as JSON in a Plex season's summary field.
///
/// The JSON keys are shared with metadata written by earlier tooling and must not change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonMetadata {
    #[serde(rename = "myAnimeListID")]
    pub catalog_id: u64,
    /// Absolute episode number that local index 1 of this season corresponds to
    #[serde(rename = "firstEpisode")]
    pub first_episode: i64,
}

impl SeasonMetadata {
    pub fn new(catalog_id: u64, first_episode: i64) -> Self {
        Self {
            catalog_id,
            first_episode,
        }
    }

    /// Translate a season-local episode index into the list service's numbering.
    /// `None` when the result does not fit in an `i64`.
    pub fn absolute_episode(&self, local_index: i32) -> Option<i64> {
        i64::from(local_index).checked_add(self.first_episode)?.checked_sub(1)
    }
}
