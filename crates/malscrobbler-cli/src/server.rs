//! Webhook listener.
//!
//! Every accepted event is handed to its own task and the request is answered
//! right away; scrobble failures only show up in the logs.

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use scrobble_config::ServerConfig;
use scrobble_core::Scrobbler;
use scrobble_models::PlaybackCompletionEvent;
use scrobble_sources::plex::WebhookError;
use scrobble_sources::{PlexWebhook, WebhookEventKind};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Name of the multipart part carrying the JSON document
const PAYLOAD_FIELD: &str = "payload";

#[derive(Clone)]
pub struct WebhookContext {
    scrobbler: Arc<Scrobbler>,
}

/// What to do with a parsed webhook
#[derive(Debug, PartialEq)]
pub enum Dispatch {
    Scrobble(PlaybackCompletionEvent),
    Ignore(String),
}

pub fn create_router(scrobbler: Arc<Scrobbler>, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(webhook_path, post(handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(WebhookContext { scrobbler })
}

pub async fn run_server(config: &ServerConfig, addr: SocketAddr, scrobbler: Arc<Scrobbler>) -> anyhow::Result<()> {
    let app = create_router(scrobbler, &config.webhook_path);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        operation = "server_started",
        address = %addr,
        webhook_path = %config.webhook_path,
        "Listening for Plex webhooks"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Webhook listener failed")?;

    info!(operation = "server_stopped", "Server shutdown complete");
    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Decide whether a webhook should be scrobbled.
///
/// `media.scrobble` always is; `media.pause` only in dry-run mode so a decision
/// can be previewed without finishing an episode.
pub fn dispatch(webhook: &PlexWebhook, dry_run: bool) -> Result<Dispatch, WebhookError> {
    match webhook.kind() {
        WebhookEventKind::Scrobble => {}
        WebhookEventKind::Pause if dry_run => {}
        WebhookEventKind::Pause => return Ok(Dispatch::Ignore("media.pause outside dry-run mode".to_string())),
        WebhookEventKind::Other(event) => return Ok(Dispatch::Ignore(format!("event '{}' not handled", event))),
    }

    match webhook.to_completion_event() {
        Ok(event) => Ok(Dispatch::Scrobble(event)),
        Err(WebhookError::NotAnEpisode(kind)) => Ok(Dispatch::Ignore(format!("{} is not an episode", kind))),
        Err(e) => Err(e),
    }
}

async fn handle_webhook(
    State(ctx): State<WebhookContext>,
    request: Request,
) -> Result<Json<Value>, (StatusCode, String)> {
    let payload = read_payload(request).await?;
    let webhook = PlexWebhook::parse(&payload).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    debug!(event = %webhook.event, viewer = webhook.viewer(), "Received Plex webhook");

    match dispatch(&webhook, ctx.scrobbler.is_dry_run()) {
        Ok(Dispatch::Scrobble(event)) => {
            let scrobbler = ctx.scrobbler.clone();
            tokio::spawn(async move {
                scrobbler.process(event).await;
            });
            Ok(Json(json!({ "status": "accepted" })))
        }
        Ok(Dispatch::Ignore(reason)) => {
            debug!("Ignoring webhook: {}", reason);
            Ok(Json(json!({ "status": "ignored", "reason": reason })))
        }
        Err(e) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

/// Pull the JSON document out of a multipart form, or take the body as-is
async fn read_payload(request: Request) -> Result<Bytes, (StatusCode, String)> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        return Bytes::from_request(request, &())
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some(PAYLOAD_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()));
        }
    }

    Err((
        StatusCode::BAD_REQUEST,
        format!("Multipart body has no '{}' part", PAYLOAD_FIELD),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
