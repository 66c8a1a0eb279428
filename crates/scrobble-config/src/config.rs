use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_MAL_API_BASE_URL: &str = "https://api.myanimelist.net/v2";
pub const DEFAULT_MAL_TOKEN_URL: &str = "https://myanimelist.net/v1/oauth2/token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub plex: PlexConfig,
    pub mal: MalConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scrobble: ScrobbleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlexConfig {
    pub server_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalConfig {
    pub client_id: String,
    #[serde(default = "default_mal_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_mal_token_url")]
    pub token_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrobbleConfig {
    /// Plex account name to scrobble for. All accounts are scrobbled when unset.
    #[serde(default)]
    pub viewer: Option<String>,
    /// Compute and log decisions without updating MyAnimeList; also reacts to pause events
    #[serde(default)]
    pub dry_run: bool,
}

fn default_mal_api_base_url() -> String {
    DEFAULT_MAL_API_BASE_URL.to_string()
}

fn default_mal_token_url() -> String {
    DEFAULT_MAL_TOKEN_URL.to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_webhook_path() -> String {
    "/plex".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            webhook_path: default_webhook_path(),
        }
    }
}

impl Default for MalConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            api_base_url: default_mal_api_base_url(),
            token_url: default_mal_token_url(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plex: PlexConfig {
                server_url: String::new(),
            },
            mal: MalConfig::default(),
            server: ServerConfig::default(),
            scrobble: ScrobbleConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind_address '{}': {}", self.bind_address, e))
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.plex.server_url.trim().is_empty() {
            return Err(anyhow::anyhow!("plex.server_url is required"));
        }

        if self.mal.client_id.trim().is_empty() || self.mal.client_id == "YOUR_CLIENT_ID" {
            return Err(anyhow::anyhow!("mal.client_id is required"));
        }

        self.server.socket_addr()?;

        if !self.server.webhook_path.starts_with('/') {
            return Err(anyhow::anyhow!(
                "server.webhook_path must start with '/': {}",
                self.server.webhook_path
            ));
        }

        if let Some(viewer) = &self.scrobble.viewer {
            if viewer.trim().is_empty() {
                return Err(anyhow::anyhow!("scrobble.viewer cannot be blank; remove it to scrobble every account"));
            }
        }

        Ok(())
    }
}
