use serde::{Deserialize, Serialize};

/// A finished (or, in dry-run mode, paused) episode playback reported by the media server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaybackCompletionEvent {
    pub viewer: String,
    pub server: String,
    /// Opaque key of the season the episode belongs to (Plex `parentRatingKey`)
    pub season_id: String,
    pub series_title: String,
    pub season_title: String,
    pub episode_title: String,
    /// 1-based index of the episode within its season
    pub local_index: i32,
}
