use super::prompts;
use crate::output::{Output, OutputFormat};
use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use scrobble_config::{Config, CredentialStore, PathManager};
use scrobble_sources::{MalClient, PlexClient};
use serde_json::json;
use std::path::PathBuf;

pub async fn run_config(cmd: crate::ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        crate::ConfigCommands::Show { full } => show_config(full, output),
        crate::ConfigCommands::Plex { token, server_url } => configure_plex(token, server_url, output).await,
        crate::ConfigCommands::Mal {
            client_id,
            access_token,
            refresh_token,
        } => configure_mal(client_id, access_token, refresh_token, output).await,
    }
}

fn load_credentials(path_manager: &PathManager) -> Result<CredentialStore> {
    let credentials_file = path_manager.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    Ok(cred_store)
}

/// Existing config, or the defaults when none has been written yet
fn load_or_default_config(config_file: &PathBuf, output: &Output) -> Result<Config> {
    if config_file.exists() {
        Config::load_from_file(config_file)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))
    } else {
        output.info("Configuration file not found. Creating default configuration...");
        Ok(Config::default())
    }
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Configuration will be created when you run 'malscrobbler config plex' or 'malscrobbler config mal'.");
        return Ok(());
    }

    let config = Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    let cred_store = load_credentials(&path_manager)?;

    let secret = |value: Option<&String>| -> String {
        match value {
            Some(v) if full => v.clone(),
            Some(v) => mask_string(v),
            None => "<not set>".to_string(),
        }
    };
    let client_id = if full {
        config.mal.client_id.clone()
    } else {
        mask_string(&config.mal.client_id)
    };
    let token_expires = cred_store
        .get_mal_token_expires()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "<unknown>".to_string());
    let viewer = config.scrobble.viewer.clone().unwrap_or_else(|| "<any>".to_string());

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }

            println!("\n{}", "Configuration".bright_cyan().bold());
            println!();

            let mut info_table = Table::new();
            info_table.set_header(vec![
                Cell::new("Config File").add_attribute(comfy_table::Attribute::Bold),
                Cell::new(config_file.display().to_string()),
            ]);
            println!("{}", styled(info_table));
            println!();

            let mut plex_table = section("Plex Configuration");
            plex_table.add_row(vec![Cell::new("Server URL"), Cell::new(&config.plex.server_url)]);
            plex_table.add_row(vec![Cell::new("Token"), Cell::new(secret(cred_store.get_plex_token()))]);
            println!("{}", styled(plex_table));
            println!();

            let mut mal_table = section("MyAnimeList Configuration");
            mal_table.add_row(vec![Cell::new("Client ID"), Cell::new(&client_id)]);
            mal_table.add_row(vec![Cell::new("API URL"), Cell::new(&config.mal.api_base_url)]);
            mal_table.add_row(vec![Cell::new("Token URL"), Cell::new(&config.mal.token_url)]);
            mal_table.add_row(vec![
                Cell::new("Access Token"),
                Cell::new(secret(cred_store.get_mal_access_token())),
            ]);
            mal_table.add_row(vec![
                Cell::new("Refresh Token"),
                Cell::new(secret(cred_store.get_mal_refresh_token())),
            ]);
            mal_table.add_row(vec![Cell::new("Token Expires"), Cell::new(&token_expires)]);
            println!("{}", styled(mal_table));
            println!();

            let mut server_table = section("Webhook Listener");
            server_table.add_row(vec![Cell::new("Bind Address"), Cell::new(&config.server.bind_address)]);
            server_table.add_row(vec![Cell::new("Webhook Path"), Cell::new(&config.server.webhook_path)]);
            println!("{}", styled(server_table));
            println!();

            let mut scrobble_table = section("Scrobble Options");
            scrobble_table.add_row(vec![Cell::new("Viewer"), Cell::new(&viewer)]);
            scrobble_table.add_row(vec![
                Cell::new("Dry Run"),
                Cell::new(if config.scrobble.dry_run {
                    "✓".green().to_string()
                } else {
                    "✗".red().to_string()
                }),
            ]);
            println!("{}", styled(scrobble_table));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "config_file": config_file.display().to_string(),
                "plex": {
                    "server_url": config.plex.server_url,
                    "token": secret(cred_store.get_plex_token()),
                },
                "mal": {
                    "client_id": client_id,
                    "api_base_url": config.mal.api_base_url,
                    "token_url": config.mal.token_url,
                    "access_token": secret(cred_store.get_mal_access_token()),
                    "refresh_token": secret(cred_store.get_mal_refresh_token()),
                    "token_expires": token_expires,
                },
                "server": {
                    "bind_address": config.server.bind_address,
                    "webhook_path": config.server.webhook_path,
                },
                "scrobble": {
                    "viewer": config.scrobble.viewer,
                    "dry_run": config.scrobble.dry_run,
                },
            }));
        }
    }

    Ok(())
}

async fn configure_plex(token_arg: Option<String>, server_url_arg: Option<String>, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;

    let config_file = path_manager.config_file();
    let mut config = load_or_default_config(&config_file, output)?;
    let mut cred_store = load_credentials(&path_manager)?;

    print_section_header("Plex Setup", output);
    print_instruction_list(
        &[
            "Server URL is the address of your Plex Media Server, e.g. http://192.168.1.10:32400",
            "The token can be found by inspecting network requests in Plex Web (X-Plex-Token)",
            "Add a webhook in Plex pointing at this machine, e.g. http://<host>:8080/plex",
        ],
        output,
    );
    output.println("");

    let server_url = match server_url_arg {
        Some(url) => url,
        None => {
            let existing = Some(config.plex.server_url.as_str()).filter(|s| !s.is_empty());
            prompts::prompt_string("Plex Server URL", existing)?
        }
    };
    let server_url = server_url.trim().trim_end_matches('/').to_string();
    if server_url.is_empty() {
        return Err(color_eyre::eyre::eyre!("Plex server URL is required"));
    }

    let token = match token_arg {
        Some(t) => t,
        None => {
            let existing = cred_store.get_plex_token().cloned();
            let prompt = if existing.is_some() {
                "Plex API Token (press Enter to keep the current one)"
            } else {
                "Plex API Token"
            };
            let input = prompts::prompt_secret(prompt, existing.is_some())?;
            if input.is_empty() {
                existing.unwrap_or_default()
            } else {
                input
            }
        }
    };
    if token.is_empty() {
        return Err(color_eyre::eyre::eyre!("Plex token is required"));
    }

    config.plex.server_url = server_url.clone();

    output.println("");
    output.info("Verifying Plex server and token...");
    let verified = match PlexClient::new(&config.plex, &token) {
        Ok(client) => client.authenticate().await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    match verified {
        Ok(identity) => output.success(format!("Connected to Plex server (version {})", identity.version)),
        Err(e) => {
            output.warn(format!("Could not verify Plex server: {}", e));
            if !prompts::prompt_yes_no("Save anyway?", Some(false))? {
                return Err(color_eyre::eyre::eyre!("Plex verification failed"));
            }
        }
    }

    config
        .save_to_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    cred_store.set_plex_token(token);
    cred_store
        .save()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save credentials: {}", e))?;

    output.println("");
    output.success("Plex configuration saved!");
    output.println(format!("  Server URL: {}", server_url));

    Ok(())
}

async fn configure_mal(
    client_id_arg: Option<String>,
    access_token_arg: Option<String>,
    refresh_token_arg: Option<String>,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;

    let config_file = path_manager.config_file();
    let mut config = load_or_default_config(&config_file, output)?;
    let mut cred_store = load_credentials(&path_manager)?;

    print_section_header("MyAnimeList Setup", output);
    print_instruction_list(
        &[
            "Create an API client at https://myanimelist.net/apiconfig",
            "Authorise it with the OAuth flow to obtain an access token and a refresh token",
            "The refresh token lets malscrobbler renew the access token when it expires",
        ],
        output,
    );
    output.println("");

    let client_id = match client_id_arg {
        Some(id) => id,
        None => {
            let existing = Some(config.mal.client_id.as_str()).filter(|s| !s.is_empty() && *s != "YOUR_CLIENT_ID");
            prompts::prompt_string("MyAnimeList Client ID", existing)?
        }
    };
    validate_client_id(client_id.trim()).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    config.mal.client_id = client_id.trim().to_string();

    let access_token = match access_token_arg {
        Some(t) => Some(t),
        None => {
            let keep = cred_store.get_mal_access_token().is_some();
            let input = prompts::prompt_secret(
                if keep {
                    "Access Token (press Enter to keep the current one)"
                } else {
                    "Access Token"
                },
                keep,
            )?;
            Some(input).filter(|t| !t.is_empty())
        }
    };
    let refresh_token = match refresh_token_arg {
        Some(t) => Some(t),
        None => {
            let input = prompts::prompt_secret("Refresh Token (press Enter to skip)", true)?;
            Some(input).filter(|t| !t.is_empty())
        }
    };

    if let Some(token) = access_token {
        cred_store.set_mal_access_token(token);
        // Expiry of a pasted token is unknown; a rejected token triggers a refresh instead
        cred_store.remove("mal_token_expires");
    }
    if let Some(token) = refresh_token {
        cred_store.set_mal_refresh_token(token);
    }

    if cred_store.get_mal_access_token().is_none() {
        return Err(color_eyre::eyre::eyre!("MyAnimeList access token is required"));
    }

    config
        .save_to_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    cred_store
        .save()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save credentials: {}", e))?;

    output.println("");
    output.info("Verifying MyAnimeList token...");
    let client = MalClient::from_credentials(&config.mal, &cred_store)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create MyAnimeList client: {}", e))?;
    match client.authenticate().await {
        Ok(username) => output.success(format!("Authenticated as {}", username)),
        Err(e) => output.warn(format!("Could not verify MyAnimeList token: {}", e)),
    }

    output.println("");
    output.success("MyAnimeList configuration saved!");

    Ok(())
}

fn mask_string(s: &str) -> String {
    if s.is_empty() || s == "YOUR_CLIENT_ID" {
        return "<not set>".to_string();
    }
    if s.chars().count() <= 4 {
        return "*".repeat(s.chars().count());
    }
    let chars: Vec<char> = s.chars().collect();
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

fn validate_client_id(input: &str) -> Result<(), &'static str> {
    if input.is_empty() {
        return Err("Client ID cannot be empty");
    }
    if input.len() < 10 {
        return Err("Client ID seems too short. Please verify it's correct.");
    }
    Ok(())
}

fn section(title: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec![Cell::new(title)
        .fg(comfy_table::Color::Cyan)
        .add_attribute(comfy_table::Attribute::Bold)]);
    table
}

fn styled(mut table: Table) -> Table {
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

/// Print a formatted section header
fn print_section_header(title: &str, output: &Output) {
    output.println("");
    output.println(format!("{}", title.bold().bright_cyan()));
    output.println(format!("{}", "─".repeat(title.len()).bright_cyan()));
}

/// Print a numbered instruction list
fn print_instruction_list(items: &[&str], output: &Output) {
    for (idx, item) in items.iter().enumerate() {
        output.println(format!("  {}. {}", idx + 1, item));
    }
}
