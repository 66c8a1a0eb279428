pub mod api;
pub mod client;
pub mod webhook;

pub use client::PlexClient;
pub use webhook::{PlexWebhook, WebhookError, WebhookEventKind};
