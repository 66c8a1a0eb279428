pub mod decision;
pub mod event;
pub mod list_entry;
pub mod season;

pub use decision::{EntryUpdate, NoOpReason, ReconciliationDecision};
pub use event::PlaybackCompletionEvent;
pub use list_entry::{EntryDate, ListEntry, ListStatus, UNSET_DATE_SENTINEL};
pub use season::SeasonMetadata;
