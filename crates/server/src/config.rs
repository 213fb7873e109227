//! Server configuration

use anyhow::{Context, Result};
use risk_lib::predictor::ModelSettings;
use risk_lib::SchemaSource;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Env var naming the optional configuration file
pub const CONFIG_PATH_ENV: &str = "HRP_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "risk-server.toml";

/// Prefix of the environment variables read by the server
const ENV_PREFIX: &str = "HRP_SERVER";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Port for the prediction, health and metrics API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Classifier artifact location and layout
    #[serde(default)]
    pub model: ModelSettings,

    /// Where the feature order comes from
    #[serde(default)]
    pub schema: SchemaSource,
}

fn default_api_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            model: ModelSettings::default(),
            schema: SchemaSource::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the optional config file and the environment
    ///
    /// Environment variables use the `HRP_SERVER_` prefix and `__` for
    /// nesting, e.g. `HRP_SERVER_MODEL__PATH=models/lr.json`. Other `HRP_*`
    /// variables belong to the CLI and are not read.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: &Path, env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        config
            .try_deserialize()
            .context("Invalid server configuration")
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}
