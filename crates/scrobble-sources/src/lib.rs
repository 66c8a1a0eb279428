pub mod error;
pub mod mal;
pub mod plex;
pub mod traits;

pub use error::SourceError;
pub use mal::MalClient;
pub use plex::{PlexClient, PlexWebhook, WebhookEventKind};
pub use traits::{ListService, MetadataStore};
