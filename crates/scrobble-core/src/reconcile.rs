// Reconciliation of a finished episode against the viewer's list entry

use crate::error::ScrobbleError;
use chrono::NaiveDate;
use scrobble_models::{
    EntryUpdate, ListEntry, ListStatus, NoOpReason, PlaybackCompletionEvent, ReconciliationDecision,
    SeasonMetadata,
};

/// Compute the update a finished episode implies for `entry`.
///
/// Pure: the outcome depends only on the arguments. `today` is used for any start or
/// finish date that has to be filled in.
///
/// A completed entry that is not being rewatched starts a rewatch and is never treated
/// as a duplicate. Otherwise an entry that already records this episode (or a later one)
/// yields `NoOp`, which keeps redelivered and out-of-order events harmless.
pub fn reconcile(
    event: &PlaybackCompletionEvent,
    metadata: &SeasonMetadata,
    entry: &ListEntry,
    today: NaiveDate,
) -> Result<ReconciliationDecision, ScrobbleError> {
    let absolute = metadata.absolute_episode(event.local_index);
    let episode = absolute
        .and_then(|absolute| u32::try_from(absolute).ok())
        .filter(|episode| *episode > 0)
        .ok_or(ScrobbleError::EpisodeNumber {
            local_index: event.local_index,
            first_episode: metadata.first_episode,
            absolute,
        })?;

    let starts_rewatch = entry.status == ListStatus::Completed && !entry.rewatching;
    let rewatching = entry.rewatching || starts_rewatch;

    if !starts_rewatch && entry.watched_episodes >= episode {
        return Ok(ReconciliationDecision::NoOp(NoOpReason::AlreadyRecorded {
            watched_episodes: entry.watched_episodes,
            episode,
        }));
    }

    // A total of 0 means unknown and never matches
    let status = if entry.status == ListStatus::Completed || episode == entry.total_episodes {
        ListStatus::Completed
    } else {
        ListStatus::Watching
    };

    let start_date = entry.start_date.is_unset().then_some(today);
    let finish_date = (status == ListStatus::Completed && entry.finish_date.is_unset()).then_some(today);

    Ok(ReconciliationDecision::Apply(EntryUpdate {
        watched_episodes: episode,
        status,
        rewatching,
        score: entry.score,
        tags: entry.tags.clone(),
        start_date,
        finish_date,
    }))
}

#[cfg(test)]
mod tests;
