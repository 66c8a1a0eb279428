pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{Config, MalConfig, PlexConfig, ScrobbleConfig, ServerConfig, DEFAULT_MAL_API_BASE_URL, DEFAULT_MAL_TOKEN_URL};
pub use credentials::CredentialStore;
pub use paths::{PathManager, container_base_path};
