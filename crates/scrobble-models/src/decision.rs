use crate::list_entry::ListStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fields to write to a list entry. Dates are only present when they should be set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryUpdate {
    pub watched_episodes: u32,
    pub status: ListStatus,
    pub rewatching: bool,
    pub score: u8,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NoOpReason {
    /// The entry already records this episode or a later one
    AlreadyRecorded { watched_episodes: u32, episode: u32 },
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOpReason::AlreadyRecorded {
                watched_episodes,
                episode,
            } => write!(
                f,
                "already recorded (episode {}, entry has {} watched)",
                episode, watched_episodes
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReconciliationDecision {
    NoOp(NoOpReason),
    Apply(EntryUpdate),
}

impl ReconciliationDecision {
    pub fn is_noop(&self) -> bool {
        matches!(self, ReconciliationDecision::NoOp(_))
    }
}
