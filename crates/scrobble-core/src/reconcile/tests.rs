use super::*;
use scrobble_models::EntryDate;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn earlier() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 7, 1).unwrap()
}

fn create_event(local_index: i32) -> PlaybackCompletionEvent {
    PlaybackCompletionEvent {
        viewer: "alice".to_string(),
        server: "Living Room".to_string(),
        season_id: "1935".to_string(),
        series_title: "Some Show".to_string(),
        season_title: "Season 1".to_string(),
        episode_title: format!("Episode {}", local_index),
        local_index,
    }
}

fn create_entry(status: ListStatus, watched_episodes: u32, total_episodes: u32) -> ListEntry {
    ListEntry {
        catalog_id: 20583,
        title: "Some Show".to_string(),
        watched_episodes,
        total_episodes,
        status,
        rewatching: false,
        score: 8,
        tags: vec!["seasonal".to_string()],
        start_date: EntryDate::Set(earlier()),
        finish_date: EntryDate::Unset,
    }
}

fn season(first_episode: i64) -> SeasonMetadata {
    SeasonMetadata::new(20583, first_episode)
}

fn apply(decision: ReconciliationDecision) -> EntryUpdate {
    match decision {
        ReconciliationDecision::Apply(update) => update,
        ReconciliationDecision::NoOp(reason) => panic!("expected an update, got no-op: {}", reason),
    }
}

/// Write an update back onto an entry the way the list service would
fn applied(entry: &ListEntry, update: &EntryUpdate) -> ListEntry {
    ListEntry {
        watched_episodes: update.watched_episodes,
        status: update.status,
        rewatching: update.rewatching,
        score: update.score,
        tags: update.tags.clone(),
        start_date: update.start_date.map(EntryDate::Set).unwrap_or(entry.start_date),
        finish_date: update.finish_date.map(EntryDate::Set).unwrap_or(entry.finish_date),
        ..entry.clone()
    }
}

#[test]
fn test_next_episode_advances_progress() {
    let entry = create_entry(ListStatus::Watching, 4, 12);
    let update = apply(reconcile(&create_event(5), &season(1), &entry, today()).unwrap());

    assert_eq!(update.watched_episodes, 5);
    assert_eq!(update.status, ListStatus::Watching);
    assert!(!update.rewatching);
    assert_eq!(update.start_date, None);
    assert_eq!(update.finish_date, None);
}

#[test]
fn test_offset_translates_to_absolute_episode() {
    let entry = create_entry(ListStatus::Watching, 12, 24);
    let update = apply(reconcile(&create_event(1), &season(13), &entry, today()).unwrap());
    assert_eq!(update.watched_episodes, 13);
}

#[test]
fn test_same_event_twice_is_noop() {
    let entry = create_entry(ListStatus::Watching, 2, 12);
    let event = create_event(3);

    let update = apply(reconcile(&event, &season(1), &entry, today()).unwrap());
    let updated_entry = applied(&entry, &update);

    let second = reconcile(&event, &season(1), &updated_entry, today()).unwrap();
    assert_eq!(
        second,
        ReconciliationDecision::NoOp(NoOpReason::AlreadyRecorded {
            watched_episodes: 3,
            episode: 3,
        })
    );
}

#[test]
fn test_completed_entry_starts_rewatch() {
    let mut entry = create_entry(ListStatus::Completed, 12, 12);
    entry.finish_date = EntryDate::Set(earlier());

    let decision = reconcile(&create_event(1), &season(1), &entry, today()).unwrap();
    assert!(!decision.is_noop());

    let update = apply(decision);
    assert!(update.rewatching);
    assert_eq!(update.watched_episodes, 1);
    assert_eq!(update.status, ListStatus::Completed);
    assert_eq!(update.finish_date, None);
}

#[test]
fn test_rewatch_progress_is_guarded_after_it_started() {
    let mut entry = create_entry(ListStatus::Completed, 3, 12);
    entry.rewatching = true;

    let decision = reconcile(&create_event(2), &season(1), &entry, today()).unwrap();
    assert!(decision.is_noop());

    let update = apply(reconcile(&create_event(4), &season(1), &entry, today()).unwrap());
    assert!(update.rewatching);
    assert_eq!(update.watched_episodes, 4);
}

#[test]
fn test_regressive_episode_is_noop() {
    let entry = create_entry(ListStatus::Watching, 5, 12);
    let decision = reconcile(&create_event(3), &season(1), &entry, today()).unwrap();
    assert!(decision.is_noop());
}

#[test]
fn test_final_episode_completes_series() {
    let entry = create_entry(ListStatus::Watching, 11, 12);
    let update = apply(reconcile(&create_event(12), &season(1), &entry, today()).unwrap());

    assert_eq!(update.status, ListStatus::Completed);
    assert_eq!(update.watched_episodes, 12);
    assert_eq!(update.finish_date, Some(today()));
}

#[test]
fn test_completion_keeps_existing_finish_date() {
    let mut entry = create_entry(ListStatus::Watching, 11, 12);
    entry.finish_date = EntryDate::Set(earlier());

    let update = apply(reconcile(&create_event(12), &season(1), &entry, today()).unwrap());
    assert_eq!(update.status, ListStatus::Completed);
    assert_eq!(update.finish_date, None);
}

#[test]
fn test_unknown_total_never_completes() {
    let entry = create_entry(ListStatus::Watching, 3, 0);
    let update = apply(reconcile(&create_event(4), &season(1), &entry, today()).unwrap());

    assert_eq!(update.status, ListStatus::Watching);
    assert_eq!(update.finish_date, None);
}

#[test]
fn test_episode_past_total_does_not_complete() {
    let entry = create_entry(ListStatus::Watching, 11, 12);
    let update = apply(reconcile(&create_event(13), &season(1), &entry, today()).unwrap());
    assert_eq!(update.status, ListStatus::Watching);
}

#[test]
fn test_first_progress_sets_start_date() {
    let mut entry = create_entry(ListStatus::PlanToWatch, 0, 12);
    entry.start_date = EntryDate::Unset;

    let update = apply(reconcile(&create_event(1), &season(1), &entry, today()).unwrap());
    assert_eq!(update.start_date, Some(today()));
    assert_eq!(update.status, ListStatus::Watching);
}

#[test]
fn test_single_episode_series_sets_both_dates() {
    let mut entry = create_entry(ListStatus::PlanToWatch, 0, 1);
    entry.start_date = EntryDate::Unset;

    let update = apply(reconcile(&create_event(1), &season(1), &entry, today()).unwrap());
    assert_eq!(update.status, ListStatus::Completed);
    assert_eq!(update.start_date, Some(today()));
    assert_eq!(update.finish_date, Some(today()));
}

#[test]
fn test_on_hold_and_dropped_resume_as_watching() {
    for status in [ListStatus::OnHold, ListStatus::Dropped] {
        let entry = create_entry(status, 4, 12);
        let update = apply(reconcile(&create_event(5), &season(1), &entry, today()).unwrap());
        assert_eq!(update.status, ListStatus::Watching);
    }
}

#[test]
fn test_user_fields_are_carried_forward() {
    let mut entry = create_entry(ListStatus::Watching, 1, 12);
    entry.score = 9;
    entry.tags = vec!["rewatch-worthy".to_string(), "subbed".to_string()];

    let update = apply(reconcile(&create_event(2), &season(1), &entry, today()).unwrap());
    assert_eq!(update.score, 9);
    assert_eq!(update.tags, entry.tags);
}

#[test]
fn test_non_positive_episode_number_is_rejected() {
    let entry = create_entry(ListStatus::Watching, 0, 12);

    let err = reconcile(&create_event(0), &season(1), &entry, today()).unwrap_err();
    assert!(matches!(
        err,
        ScrobbleError::EpisodeNumber {
            local_index: 0,
            first_episode: 1,
            absolute: Some(0)
        }
    ));

    let err = reconcile(&create_event(-3), &season(2), &entry, today()).unwrap_err();
    assert!(matches!(err, ScrobbleError::EpisodeNumber { absolute: Some(-2), .. }));
}

#[test]
fn test_overflowing_first_episode_is_rejected() {
    let entry = create_entry(ListStatus::Watching, 0, 12);

    let err = reconcile(&create_event(2), &season(i64::MAX), &entry, today()).unwrap_err();
    assert!(matches!(
        err,
        ScrobbleError::EpisodeNumber {
            local_index: 2,
            absolute: None,
            ..
        }
    ));
}

#[test]
fn test_episode_beyond_list_range_is_rejected() {
    let entry = create_entry(ListStatus::Watching, 0, 12);

    let err = reconcile(&create_event(1), &season(i64::from(u32::MAX) + 1), &entry, today()).unwrap_err();
    assert!(matches!(err, ScrobbleError::EpisodeNumber { .. }));
}
