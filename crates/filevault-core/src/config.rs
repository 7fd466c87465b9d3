//! Configuration loaded from `config/<env>.json` with environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::merkle::HashScheme;

/// Environment variable selecting the config file.
pub const ENV_VAR: &str = "APP_ENV";
/// Environment used when `APP_ENV` is unset.
pub const DEFAULT_ENV: &str = "dev";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub version: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "filevault".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Server-side storage locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSection {
    /// Directory receiving uploaded files, one subdirectory per session
    pub dir: PathBuf,
    /// SQLite database holding the arrival log and session roots
    pub database: PathBuf,
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploaded_files"),
            database: PathBuf::from("filevault.db"),
        }
    }
}

/// Client-side settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// File holding the trusted root of the last upload
    pub root_file: PathBuf,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            root_file: PathBuf::from("merkle_root.txt"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppSection,
    pub vault: VaultSection,
    pub client: ClientSection,
    pub hash_scheme: HashScheme,
}

impl Config {
    /// Environment name from `APP_ENV`, defaulting to `dev`.
    pub fn env_name() -> String {
        env::var(ENV_VAR)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ENV.to_string())
    }

    /// Load `config/<env>.json` relative to the working directory.
    pub fn load(env_name: &str) -> ConfigResult<Self> {
        Self::load_from_dir("config", env_name)
    }

    /// Load `<dir>/<env>.json`, falling back to defaults when absent, then
    /// apply `FILEVAULT_*` environment overrides.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P, env_name: &str) -> ConfigResult<Self> {
        let path = dir.as_ref().join(format!("{}.json", env_name));

        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let config = Self::from_json(&raw)?;
            info!(path = %path.display(), "configuration loaded");
            config
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply overrides from a key lookup (the process environment in practice).
    ///
    /// - `FILEVAULT_DIR`: vault storage directory
    /// - `FILEVAULT_DATABASE`: SQLite database path
    /// - `FILEVAULT_ROOT_FILE`: client trusted-root file
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("FILEVAULT_DIR") {
            self.vault.dir = PathBuf::from(dir);
        }
        if let Some(database) = lookup("FILEVAULT_DATABASE") {
            self.vault.database = PathBuf::from(database);
        }
        if let Some(root_file) = lookup("FILEVAULT_ROOT_FILE") {
            self.client.root_file = PathBuf::from(root_file);
        }
    }
}
