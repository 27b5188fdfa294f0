use std::path::{Path, PathBuf};
use std::{fs, iter};

use anyhow::{bail, Context};
use directories_next::ProjectDirs;
use serde::Deserialize;
use tracing::info;

/// Hard cap on configurable expiry durations. Keeps every computed
/// `expires_at` far inside chrono's representable range.
const MAX_EXPIRY_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub port: u16,
    pub database: Database,
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Cap on the whole request body; leaves headroom over the content cap
    /// for form-encoding overhead.
    pub max_upload_size: usize,
    /// Cap on stored paste content, in bytes.
    pub max_content_size: usize,
    /// The durations a paste may be created with, in days.
    pub expiry_days: Vec<u32>,
    /// Duration applied when the request does not pick one.
    pub default_expiry_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://localhost:8080".to_owned(),
            port: 8080,
            database: Database::default(),
            limits: Limits::default(),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Database {
            url: "sqlite://minibin.db?mode=rwc".to_owned(),
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_upload_size: 1024 * 1024,
            max_content_size: 256 * 1024,
            expiry_days: vec![1, 7, 30],
            default_expiry_days: 7,
        }
    }
}

impl Config {
    /// Load the config from the given file, or the first one discovered in
    /// the usual locations, or fall back to the built-in defaults.
    pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
        let path = match override_path {
            Some(path) => Some(path.to_path_buf()),
            None => discovered_config_path(),
        };

        let config = match path {
            Some(path) => Config::read_from(&path)?,
            None => {
                info!("no config file found, using defaults");
                Config::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn read_from(path: &Path) -> anyhow::Result<Config> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let limits = &self.limits;
        if limits.expiry_days.is_empty() {
            bail!("limits.expiry_days must not be empty");
        }
        if limits.expiry_days.contains(&0) {
            bail!("limits.expiry_days entries must be at least one day");
        }
        if let Some(days) = limits.expiry_days.iter().find(|&&days| days > MAX_EXPIRY_DAYS) {
            bail!("limits.expiry_days entry {days} exceeds the maximum of {MAX_EXPIRY_DAYS} days");
        }
        if !limits.expiry_days.contains(&limits.default_expiry_days) {
            bail!(
                "limits.default_expiry_days ({}) is not one of limits.expiry_days",
                limits.default_expiry_days
            );
        }
        if limits.max_content_size == 0 {
            bail!("limits.max_content_size must be positive");
        }
        if limits.max_content_size > limits.max_upload_size {
            bail!("limits.max_content_size exceeds limits.max_upload_size");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be positive");
        }
        Ok(())
    }
}

fn discovered_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "minibin")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .into_iter()
        .chain(iter::once(PathBuf::from("config.toml")))
        .find(|path| path.is_file())
}
