use crate::logging;
use crate::output::Output;
use crate::server;
use color_eyre::Result;
use scrobble_config::{Config, CredentialStore, PathManager};
use scrobble_core::Scrobbler;
use scrobble_sources::{MalClient, PlexClient};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Flags of `malscrobbler serve` that override the configuration file
#[derive(Debug, Default, Clone)]
pub struct ServeOptions {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub viewer: Option<String>,
    pub dry_run: bool,
    /// `Some("")` means the default log file
    pub log_file: Option<String>,
}

/// Apply command-line overrides and return the address to listen on
pub fn apply_overrides(config: &mut Config, options: &ServeOptions) -> anyhow::Result<SocketAddr> {
    if let Some(bind) = &options.bind {
        config.server.bind_address = bind.clone();
    }

    let mut addr = config.server.socket_addr()?;
    if let Some(port) = options.port {
        addr.set_port(port);
        config.server.bind_address = addr.to_string();
    }

    if let Some(viewer) = &options.viewer {
        config.scrobble.viewer = Some(viewer.clone());
    }
    if options.dry_run {
        config.scrobble.dry_run = true;
    }

    Ok(addr)
}

fn resolve_log_file(option: Option<&str>, path_manager: &PathManager) -> Option<PathBuf> {
    option.map(|p| {
        if p.is_empty() {
            path_manager.server_log_file()
        } else {
            PathBuf::from(p)
        }
    })
}

pub async fn run_serve(options: ServeOptions, verbose: u8, quiet: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();

    let log_file = resolve_log_file(options.log_file.as_deref(), &path_manager);
    logging::init_logging_with_file(verbose, quiet, log_file.clone())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to initialise logging: {}", e))?;
    if let Some(path) = &log_file {
        output.info(format!("Logs are being written to: {}", path.display()));
    }

    let config_file = path_manager.config_file();
    if !config_file.exists() {
        return Err(color_eyre::eyre::eyre!(
            "Configuration file not found at {}. Run 'malscrobbler config plex' and 'malscrobbler config mal' first.",
            config_file.display()
        ));
    }

    let mut config = Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    let addr = apply_overrides(&mut config, &options).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Configuration validation failed: {}", e))?;

    let credentials_file = path_manager.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;

    let plex_token = cred_store
        .get_plex_token()
        .cloned()
        .ok_or_else(|| color_eyre::eyre::eyre!("No Plex token stored. Run 'malscrobbler config plex' first."))?;

    let plex = PlexClient::new(&config.plex, &plex_token)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create Plex client: {}", e))?;
    plex.authenticate()
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Plex verification failed: {}", e))?;

    let mal = MalClient::from_credentials(&config.mal, &cred_store)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create MyAnimeList client: {}", e))?;
    let username = mal
        .authenticate()
        .await
        .map_err(|e| color_eyre::eyre::eyre!("MyAnimeList verification failed: {}", e))?;

    output.success(format!("Connected to Plex at {}", config.plex.server_url));
    output.success(format!("Connected to MyAnimeList as {}", username));
    if let Some(viewer) = &config.scrobble.viewer {
        output.info(format!("Only scrobbling for Plex account '{}'", viewer));
    }
    if config.scrobble.dry_run {
        output.warn("Dry-run mode: MyAnimeList will not be updated");
    }

    info!(
        operation = "serve_start",
        mal_user = %username,
        viewer = config.scrobble.viewer.as_deref().unwrap_or("<any>"),
        dry_run = config.scrobble.dry_run,
        "Starting scrobbler"
    );

    let scrobbler = Arc::new(Scrobbler::new(Arc::new(plex), Arc::new(mal), &config.scrobble));
    server::run_server(&config.server, addr, scrobbler)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("{:#}", e))?;

    Ok(())
}
