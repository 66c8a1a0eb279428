use crate::output::{Output, OutputFormat};
use color_eyre::Result;
use comfy_table::{Cell, Table};
use scrobble_config::{Config, CredentialStore, PathManager};
use scrobble_core::MetadataResolver;
use scrobble_models::{ListEntry, SeasonMetadata};
use scrobble_sources::{ListService, MalClient, PlexClient};
use serde_json::json;
use std::sync::Arc;

/// Resolve a season's mapping and show the list entry it points to
pub async fn run_check(season_id: &str, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();
    let config = Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;

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

    let resolver = MetadataResolver::new(Arc::new(plex));
    let metadata = resolver.resolve(season_id).await?;

    let mal = MalClient::from_credentials(&config.mal, &cred_store)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create MyAnimeList client: {}", e))?;
    mal.authenticate()
        .await
        .map_err(|e| color_eyre::eyre::eyre!("MyAnimeList verification failed: {}", e))?;

    let entry = mal.get_entry(metadata.catalog_id).await?;

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }
            println!("{}", mapping_table(season_id, &metadata));
            println!();
            match &entry {
                Some(entry) => println!("{}", entry_table(entry)),
                None => output.warn(format!(
                    "Anime {} is not on your MyAnimeList list; scrobbles for this season will fail",
                    metadata.catalog_id
                )),
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "season_id": season_id,
                "mapping": metadata,
                "entry": entry,
            }));
        }
    }

    Ok(())
}

fn styled(mut table: Table) -> Table {
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

fn mapping_table(season_id: &str, metadata: &SeasonMetadata) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new(format!("Plex season {}", season_id))
            .fg(comfy_table::Color::Cyan)
            .add_attribute(comfy_table::Attribute::Bold),
    ]);
    table.add_row(vec![Cell::new("MyAnimeList ID"), Cell::new(metadata.catalog_id)]);
    table.add_row(vec![Cell::new("First episode"), Cell::new(metadata.first_episode)]);
    styled(table)
}

fn entry_table(entry: &ListEntry) -> Table {
    let total = if entry.total_episodes == 0 {
        "?".to_string()
    } else {
        entry.total_episodes.to_string()
    };

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new(&entry.title)
            .fg(comfy_table::Color::Cyan)
            .add_attribute(comfy_table::Attribute::Bold),
    ]);
    table.add_row(vec![Cell::new("Status"), Cell::new(entry.status)]);
    table.add_row(vec![
        Cell::new("Progress"),
        Cell::new(format!("{}/{}", entry.watched_episodes, total)),
    ]);
    table.add_row(vec![Cell::new("Rewatching"), Cell::new(entry.rewatching)]);
    table.add_row(vec![Cell::new("Started"), Cell::new(entry.start_date)]);
    table.add_row(vec![Cell::new("Finished"), Cell::new(entry.finish_date)]);
    styled(table)
}
