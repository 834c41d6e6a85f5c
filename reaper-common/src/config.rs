//! Configuration loading and data folder resolution
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument (highest priority, clap also folds in its `env` fallback)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error; defaults are used and a warning logged.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Database file name inside the data folder
pub const DATABASE_FILE_NAME: &str = "reaper.db";

/// Placeholder left in sample `.env` files; never a real key
const STRIPE_KEY_PLACEHOLDER: &str = "your_secret_key_here";

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            data_folder: default_data_folder(),
            bind: "127.0.0.1".to_string(),
            port: 5780,
            log_level: "info".to_string(),
        }
    }
}

/// Stripe section of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeToml {
    pub secret_key: Option<String>,
    pub publishable_key: Option<String>,
    pub webhook_secret: Option<String>,
}

/// On-disk TOML configuration. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub data_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub secure_cookies: Option<bool>,
    pub public_url: Option<String>,
    #[serde(default)]
    pub stripe: StripeToml,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load a config file, returning `None` if it does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map(Some)
    }
}

/// Values supplied on the command line (already merged with clap `env` fallbacks)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub data_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub secure_cookies: Option<bool>,
}

/// Stripe credentials
#[derive(Debug, Clone, Default)]
pub struct StripeSettings {
    pub secret_key: Option<String>,
    pub publishable_key: Option<String>,
    pub webhook_secret: Option<String>,
}

impl StripeSettings {
    /// Payments are enabled only for a real-looking secret key
    pub fn is_enabled(&self) -> bool {
        match &self.secret_key {
            Some(key) => key.starts_with("sk_") && !key.contains(STRIPE_KEY_PLACEHOLDER),
            None => false,
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    pub log_level: String,
    pub secure_cookies: bool,
    pub public_url: String,
    pub stripe: StripeSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI, environment, config file and defaults
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let config_path = cli.config_file.clone().or_else(default_config_path);

        let file = match &config_path {
            Some(path) => match TomlConfig::load(path)? {
                Some(config) => {
                    info!("Loaded config file: {}", path.display());
                    config
                }
                None => {
                    warn!("Config file not found: {} (using defaults)", path.display());
                    TomlConfig::default()
                }
            },
            None => {
                warn!("Could not determine config directory (using defaults)");
                TomlConfig::default()
            }
        };

        Ok(Self::merge(cli, file, CompiledDefaults::for_current_platform()))
    }

    /// Merge the configuration layers. Environment is read for settings
    /// that have no command-line flag.
    pub fn merge(cli: &CliOverrides, file: TomlConfig, defaults: CompiledDefaults) -> Self {
        let bind = cli.bind.clone().or(file.bind).unwrap_or(defaults.bind);
        let port = cli.port.or(file.port).unwrap_or(defaults.port);

        let public_url = env_var("REAPER_PUBLIC_URL")
            .or(file.public_url)
            .unwrap_or_else(|| format!("http://{}:{}", bind, port));

        let stripe = StripeSettings {
            secret_key: env_var("STRIPE_SECRET_KEY").or(file.stripe.secret_key),
            publishable_key: env_var("STRIPE_PUBLISHABLE_KEY").or(file.stripe.publishable_key),
            webhook_secret: env_var("STRIPE_WEBHOOK_SECRET").or(file.stripe.webhook_secret),
        };

        Self {
            data_folder: cli
                .data_folder
                .clone()
                .or(file.data_folder)
                .unwrap_or(defaults.data_folder),
            bind,
            port,
            log_level: file.log_level.unwrap_or(defaults.log_level),
            secure_cookies: cli.secure_cookies.or(file.secure_cookies).unwrap_or(false),
            public_url: public_url.trim_end_matches('/').to_string(),
            stripe,
        }
    }

    /// Path of the SQLite database inside the data folder
    pub fn database_path(&self) -> PathBuf {
        self.data_folder.join(DATABASE_FILE_NAME)
    }

    /// Create the data folder if it does not exist
    pub fn ensure_data_folder(&self) -> Result<()> {
        if !self.data_folder.exists() {
            std::fs::create_dir_all(&self.data_folder)?;
            info!("Created data folder: {}", self.data_folder.display());
        }
        Ok(())
    }
}

/// Non-empty, trimmed environment variable
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Default config file location (`~/.config/reaper-list/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reaper-list").join("config.toml"))
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("reaper-list"))
        .unwrap_or_else(|| PathBuf::from("./reaper_data"))
}
