//! Client configuration management.
//!
//! Holds the backend base URL, the request timeout, the storage backend for
//! the session and the login route. Stored at
//! `~/.config/ramanlab/config.json`; every field is optional and falls back
//! to a default. `RAMANLAB_API_URL` and `RAMANLAB_TIMEOUT_SECS` override the
//! file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::shell::DEFAULT_LOGIN_ROUTE;
use crate::storage::{FileStore, KeyValueStore, KeychainStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "ramanlab";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend API root. Every request path is joined onto it.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/v1/";

/// HTTP request timeout in seconds.
/// Bulk spectrum imports upload large datasets, so this is deliberately long.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

pub const API_URL_ENV: &str = "RAMANLAB_API_URL";
pub const TIMEOUT_ENV: &str = "RAMANLAB_TIMEOUT_SECS";

/// Where the session tokens are persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub storage: StorageBackend,
    pub login_route: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply environment overrides. `lookup` is usually `std::env::var(..).ok()`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = Some(url);
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", TIMEOUT_ENV),
            }
        }
        self
    }

    /// Base URL, always ending in `/` so relative paths join under it
    pub fn api_base_url(&self) -> String {
        let url = self
            .api_base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL);
        if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{}/", url)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn login_route(&self) -> &str {
        self.login_route.as_deref().unwrap_or(DEFAULT_LOGIN_ROUTE)
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Open the configured session storage backend
    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        let store: Arc<dyn KeyValueStore> = match self.storage {
            StorageBackend::File => Arc::new(FileStore::open(self.data_dir()?)?),
            StorageBackend::Keyring => Arc::new(KeychainStore::new()),
        };
        Ok(store)
    }
}
