use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_ENDPOINT: &str = "http://api.geonames.org";
pub const USER_AGENT: &str = concat!("geonames/", env!("CARGO_PKG_VERSION"));

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_country() -> String {
    "UK".to_string()
}
fn default_charset() -> String {
    "UTF-8".to_string()
}
fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

/// Connection settings for a `GeonamesClient`
///
/// The username is the account registered with Geonames; it is sent with
/// every request and never checked locally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Request timeout; the HTTP client's own default when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            endpoint: default_endpoint(),
            language: default_language(),
            country: default_country(),
            charset: default_charset(),
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Settings read from `geonames.toml`
///
/// Client settings live at the top level next to CLI-only options:
///
/// ```toml
/// username = "demo"
/// language = "nl"
/// country = "BE"
/// verbose = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(flatten)]
    pub client: ClientConfig,
    #[serde(default)]
    pub verbose: bool,
}

impl FileConfig {
    /// Read a config file, failing if it is missing or invalid
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Search the usual locations and return the first file that parses
    pub fn load() -> Option<Self> {
        Self::load_from(&get_config_paths())
    }

    fn load_from(paths: &[PathBuf]) -> Option<Self> {
        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::from_path(path) {
                Ok(config) => return Some(config),
                Err(e) => warn!(path = %path.display(), error = %format!("{e:#}"), "Skipping config file"),
            }
        }
        None
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("geonames.toml"));
    paths.push(PathBuf::from(".geonames.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("geonames").join("config.toml"));
        paths.push(config_dir.join("geonames.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".geonames.toml"));
    }

    paths
}
