//! Configuration resolution for dpr-intake
//!
//! Two-tier priority for every setting: environment variable first, then the
//! optional `dpr-intake.toml` config file, then a compiled default.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

const CONFIG_FILE: &str = "dpr-intake.toml";
const DEFAULT_PORT: u16 = 5730;
const DEFAULT_DATABASE_PATH: &str = "dpr-intake.db";

/// Optional TOML config file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub database_path: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port for the HTTP server
    pub port: u16,
    /// SQLite database file path
    pub database_path: PathBuf,
    /// Remote scoring API key; None selects the local heuristic strategy
    pub openai_api_key: Option<String>,
    /// Override for the remote scoring API base URL
    pub openai_base_url: Option<String>,
}

impl Config {
    /// Load configuration with ENV → TOML → default priority
    pub fn load() -> Result<Self> {
        let toml_config = load_toml_config()?;

        let port = match std::env::var("DPR_INTAKE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("Invalid DPR_INTAKE_PORT: {}", e)))?,
            Err(_) => toml_config.port.unwrap_or(DEFAULT_PORT),
        };

        let database_path = std::env::var("DPR_INTAKE_DB")
            .ok()
            .or_else(|| toml_config.database_path.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

        let openai_api_key = resolve_api_key(&toml_config);
        let openai_base_url = std::env::var("DPR_INTAKE_OPENAI_URL")
            .ok()
            .or_else(|| toml_config.openai_base_url.clone());

        Ok(Config {
            port,
            database_path: PathBuf::from(database_path),
            openai_api_key,
            openai_base_url,
        })
    }
}

/// Resolve the remote scoring API key from ENV then TOML
///
/// Placeholder keys (empty, or the demo dummy value) are treated as absent so
/// the scoring engine selects the local heuristic strategy.
fn resolve_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .openai_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("OpenAI API key found in both environment and TOML; using environment");
    }

    match env_key.or(toml_key) {
        Some(key) => {
            info!("Remote scoring strategy enabled (API key configured)");
            Some(key)
        }
        None => {
            info!("No scoring API key configured; using local heuristic strategy");
            None
        }
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty() && key != "dummy-key-for-demo"
}

fn load_toml_config() -> Result<TomlConfig> {
    let path = PathBuf::from(CONFIG_FILE);
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    toml::from_str(&contents).map_err(|e| Error::Config(format!("Failed to parse {}: {}", CONFIG_FILE, e)))
}
