use crate::error::ScrobbleError;
use crate::filter::ViewerFilter;
use crate::reconcile::reconcile;
use crate::resolver::MetadataResolver;
use chrono::{Local, NaiveDate};
use scrobble_config::ScrobbleConfig;
use scrobble_models::{EntryUpdate, NoOpReason, PlaybackCompletionEvent, ReconciliationDecision};
use scrobble_sources::{ListService, MetadataStore};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrobbleOutcome {
    /// The event belongs to a viewer other than the configured one
    IgnoredViewer { viewer: String },
    NoOp(NoOpReason),
    /// Decision computed but not sent (dry-run mode)
    DryRun(EntryUpdate),
    Applied(EntryUpdate),
}

/// Runs one playback event through resolution, reconciliation and the list update.
///
/// Holds only shared read-only handles, so a single instance can serve concurrent events.
pub struct Scrobbler {
    resolver: MetadataResolver,
    list: Arc<dyn ListService>,
    filter: ViewerFilter,
    dry_run: bool,
    clock: Clock,
}

impl Scrobbler {
    pub fn new(store: Arc<dyn MetadataStore>, list: Arc<dyn ListService>, config: &ScrobbleConfig) -> Self {
        Self {
            resolver: MetadataResolver::new(store),
            list,
            filter: ViewerFilter::new(config.viewer.clone()),
            dry_run: config.dry_run,
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn filter(&self) -> &ViewerFilter {
        &self.filter
    }

    #[instrument(
        skip_all,
        fields(viewer = %event.viewer, series = %event.series_title, episode = event.local_index)
    )]
    pub async fn scrobble(&self, event: &PlaybackCompletionEvent) -> Result<ScrobbleOutcome, ScrobbleError> {
        if !self.filter.accepts(&event.viewer) {
            info!(
                expected = self.filter.viewer().unwrap_or_default(),
                "Event received for another viewer, ignoring"
            );
            return Ok(ScrobbleOutcome::IgnoredViewer {
                viewer: event.viewer.clone(),
            });
        }

        info!(
            "{} on {} finished watching {} - {} - {}",
            event.viewer, event.server, event.series_title, event.season_title, event.episode_title
        );

        let metadata = self.resolver.resolve(&event.season_id).await?;
        let catalog_id = metadata.catalog_id;

        let entry = self
            .list
            .get_entry(catalog_id)
            .await
            .map_err(|source| ScrobbleError::Lookup {
                what: format!("{} entry {}", self.list.service_name(), catalog_id),
                source,
            })?
            .ok_or(ScrobbleError::EntryNotFound { catalog_id })?;

        info!(
            catalog_id,
            title = %entry.title,
            episode = ?metadata.absolute_episode(event.local_index),
            watched_episodes = entry.watched_episodes,
            status = %entry.status,
            "Found list entry"
        );

        let today = (self.clock)();
        let update = match reconcile(event, &metadata, &entry, today)? {
            ReconciliationDecision::NoOp(reason) => {
                info!(catalog_id, "Nothing to update: {}", reason);
                return Ok(ScrobbleOutcome::NoOp(reason));
            }
            ReconciliationDecision::Apply(update) => update,
        };

        if update.rewatching && !entry.rewatching {
            info!(catalog_id, "Starting rewatch");
        }

        if self.dry_run {
            info!(catalog_id, update = ?update, "Dry-run mode, not updating list entry");
            return Ok(ScrobbleOutcome::DryRun(update));
        }

        self.list
            .update_entry(catalog_id, &update)
            .await
            .map_err(|source| ScrobbleError::Update { catalog_id, source })?;

        info!(
            catalog_id,
            title = %entry.title,
            watched_episodes = update.watched_episodes,
            status = %update.status,
            rewatching = update.rewatching,
            "Updated list entry"
        );
        Ok(ScrobbleOutcome::Applied(update))
    }

    /// Scrobble and log the result. Failures end here; they never reach the caller.
    pub async fn process(&self, event: PlaybackCompletionEvent) {
        match self.scrobble(&event).await {
            Ok(_) => {}
            Err(e @ ScrobbleError::EntryNotFound { .. }) => {
                warn!(
                    viewer = %event.viewer,
                    series = %event.series_title,
                    episode = event.local_index,
                    error = %e,
                    "Series is not on the viewer's list"
                );
            }
            Err(e) => {
                error!(
                    viewer = %event.viewer,
                    series = %event.series_title,
                    season_id = %event.season_id,
                    episode = event.local_index,
                    error = %e,
                    "Scrobble failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scrobble_models::{EntryDate, ListEntry, ListStatus};
    use scrobble_sources::SourceError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeStore {
        summary: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataStore for FakeStore {
        fn store_name(&self) -> &str {
            "fake-plex"
        }

        async fn season_summary(&self, _season_id: &str) -> Result<Option<String>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.summary.clone()))
        }
    }

    #[derive(Default)]
    struct FakeList {
        entry: Mutex<Option<ListEntry>>,
        fail_update: bool,
        get_calls: AtomicUsize,
        updates: Mutex<Vec<(u64, EntryUpdate)>>,
    }

    #[async_trait]
    impl ListService for FakeList {
        fn service_name(&self) -> &str {
            "fake-mal"
        }

        async fn get_entry(&self, catalog_id: u64) -> Result<Option<ListEntry>, SourceError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            let entry = self.entry.lock().unwrap().clone();
            Ok(entry.filter(|e| e.catalog_id == catalog_id))
        }

        async fn update_entry(&self, catalog_id: u64, update: &EntryUpdate) -> Result<(), SourceError> {
            if self.fail_update {
                return Err(SourceError::Status {
                    service: "fake-mal",
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.updates.lock().unwrap().push((catalog_id, update.clone()));

            let mut entry = self.entry.lock().unwrap();
            if let Some(entry) = entry.as_mut() {
                entry.watched_episodes = update.watched_episodes;
                entry.status = update.status;
                entry.rewatching = update.rewatching;
                if let Some(date) = update.start_date {
                    entry.start_date = EntryDate::Set(date);
                }
                if let Some(date) = update.finish_date {
                    entry.finish_date = EntryDate::Set(date);
                }
            }
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn create_event(viewer: &str, local_index: i32) -> PlaybackCompletionEvent {
        PlaybackCompletionEvent {
            viewer: viewer.to_string(),
            server: "Living Room".to_string(),
            season_id: "1935".to_string(),
            series_title: "Some Show".to_string(),
            season_title: "Season 2".to_string(),
            episode_title: "An Episode".to_string(),
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
            score: 7,
            tags: Vec::new(),
            start_date: EntryDate::Unset,
            finish_date: EntryDate::Unset,
        }
    }

    fn store(summary: &str) -> Arc<FakeStore> {
        Arc::new(FakeStore {
            summary: summary.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn list_with(entry: Option<ListEntry>) -> Arc<FakeList> {
        Arc::new(FakeList {
            entry: Mutex::new(entry),
            ..FakeList::default()
        })
    }

    fn scrobbler(store: Arc<FakeStore>, list: Arc<FakeList>, config: ScrobbleConfig) -> Scrobbler {
        Scrobbler::new(store, list, &config).with_clock(today)
    }

    const SEASON_TWO: &str = r#"{"myAnimeListID": 20583, "firstEpisode": 13}"#;

    #[tokio::test]
    async fn test_scrobble_applies_update() {
        let list = list_with(Some(create_entry(ListStatus::Watching, 13, 24)));
        let scrobbler = scrobbler(store(SEASON_TWO), list.clone(), ScrobbleConfig::default());

        let outcome = scrobbler.scrobble(&create_event("alice", 2)).await.unwrap();

        let ScrobbleOutcome::Applied(update) = outcome else {
            panic!("expected applied update, got {:?}", outcome);
        };
        assert_eq!(update.watched_episodes, 14);
        assert_eq!(update.status, ListStatus::Watching);
        assert_eq!(update.start_date, Some(today()));

        let updates = list.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, 20583);
    }

    #[tokio::test]
    async fn test_redelivered_event_is_noop() {
        let list = list_with(Some(create_entry(ListStatus::Watching, 13, 24)));
        let scrobbler = scrobbler(store(SEASON_TWO), list.clone(), ScrobbleConfig::default());
        let event = create_event("alice", 2);

        scrobbler.scrobble(&event).await.unwrap();
        let outcome = scrobbler.scrobble(&event).await.unwrap();

        assert!(matches!(outcome, ScrobbleOutcome::NoOp(_)));
        assert_eq!(list.updates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_viewer_is_ignored_before_resolution() {
        let metadata_store = store(SEASON_TWO);
        let list = list_with(Some(create_entry(ListStatus::Watching, 0, 24)));
        let config = ScrobbleConfig {
            viewer: Some("alice".to_string()),
            dry_run: false,
        };
        let scrobbler = scrobbler(metadata_store.clone(), list.clone(), config);

        let outcome = scrobbler.scrobble(&create_event("bob", 1)).await.unwrap();

        assert_eq!(
            outcome,
            ScrobbleOutcome::IgnoredViewer {
                viewer: "bob".to_string()
            }
        );
        assert_eq!(metadata_store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(list.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_metadata_skips_entry_lookup() {
        let list = list_with(Some(create_entry(ListStatus::Watching, 0, 24)));
        let scrobbler = scrobbler(store("Just a plot summary."), list.clone(), ScrobbleConfig::default());

        let err = scrobbler.scrobble(&create_event("alice", 1)).await.unwrap_err();

        assert!(matches!(err, ScrobbleError::MetadataFormat { .. }));
        assert_eq!(list.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_entry_is_reported() {
        let list = list_with(None);
        let scrobbler = scrobbler(store(SEASON_TWO), list.clone(), ScrobbleConfig::default());

        let err = scrobbler.scrobble(&create_event("alice", 1)).await.unwrap_err();

        assert!(matches!(err, ScrobbleError::EntryNotFound { catalog_id: 20583 }));
        assert!(list.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_suppresses_update() {
        let list = list_with(Some(create_entry(ListStatus::Watching, 13, 24)));
        let config = ScrobbleConfig {
            viewer: None,
            dry_run: true,
        };
        let scrobbler = scrobbler(store(SEASON_TWO), list.clone(), config);

        let outcome = scrobbler.scrobble(&create_event("alice", 12)).await.unwrap();

        let ScrobbleOutcome::DryRun(update) = outcome else {
            panic!("expected dry-run outcome, got {:?}", outcome);
        };
        assert_eq!(update.watched_episodes, 24);
        assert_eq!(update.status, ListStatus::Completed);
        assert_eq!(update.finish_date, Some(today()));
        assert!(list.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_failure_is_reported() {
        let list = Arc::new(FakeList {
            entry: Mutex::new(Some(create_entry(ListStatus::Watching, 0, 24))),
            fail_update: true,
            ..FakeList::default()
        });
        let scrobbler = scrobbler(store(SEASON_TWO), list, ScrobbleConfig::default());

        let err = scrobbler.scrobble(&create_event("alice", 1)).await.unwrap_err();
        assert!(matches!(err, ScrobbleError::Update { catalog_id: 20583, .. }));
    }

    #[tokio::test]
    async fn test_overflowing_offset_is_reported() {
        let list = list_with(Some(create_entry(ListStatus::Watching, 0, 24)));
        let summary = format!(r#"{{"myAnimeListID": 20583, "firstEpisode": {}}}"#, i64::MAX);
        let scrobbler = scrobbler(store(&summary), list.clone(), ScrobbleConfig::default());

        let err = scrobbler.scrobble(&create_event("alice", 2)).await.unwrap_err();

        assert!(matches!(err, ScrobbleError::EpisodeNumber { absolute: None, .. }));
        assert!(list.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_process_swallows_errors() {
        let list = list_with(None);
        let scrobbler = scrobbler(store(SEASON_TWO), list, ScrobbleConfig::default());

        scrobbler.process(create_event("alice", 1)).await;
    }
}
