//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! backend URL, timeouts, which credential store to use, and the last used
//! username.
//!
//! Configuration is stored at `~/.config/garagedesk/config.json`. Values can
//! be overridden with `GARAGEDESK_*` environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::client::{
    DEFAULT_BASE_URL, DEFAULT_REFRESH_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::api::ClientConfig;
use crate::auth::{FileStore, KeyringStore, SealedFileStore, TokenStore};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "garagedesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "GARAGEDESK_API_URL";
pub const ENV_TOKEN_STORE: &str = "GARAGEDESK_TOKEN_STORE";
pub const ENV_STORE_PASSPHRASE: &str = "GARAGEDESK_STORE_PASSPHRASE";

/// Where the access/refresh token pair is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Plain JSON file in the cache directory
    #[default]
    File,
    /// Passphrase-encrypted file in the cache directory
    Sealed,
    /// OS keychain
    Keyring,
    /// Process memory only; nothing persists
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreKind::File),
            "sealed" => Ok(StoreKind::Sealed),
            "keyring" => Ok(StoreKind::Keyring),
            "memory" => Ok(StoreKind::Memory),
            other => bail!("Unknown token store '{}' (expected file, sealed, keyring or memory)", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub refresh_timeout_secs: u64,
    pub token_store: StoreKind,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_timeout_secs: DEFAULT_REFRESH_TIMEOUT_SECS,
            token_store: StoreKind::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent), then apply environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// normal use).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            debug!(url = %url, "API URL overridden from environment");
            self.base_url = url.trim().to_string();
        }
        if let Some(kind) = lookup(ENV_TOKEN_STORE).filter(|v| !v.trim().is_empty()) {
            self.token_store = kind.parse()?;
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            refresh_timeout: Duration::from_secs(self.refresh_timeout_secs),
        }
    }

    /// Open the configured credential store. The sealed store reads its
    /// passphrase from `GARAGEDESK_STORE_PASSPHRASE`.
    pub fn open_token_store(&self) -> Result<TokenStore> {
        let passphrase = std::env::var(ENV_STORE_PASSPHRASE).ok();
        self.open_token_store_in(&self.cache_dir()?, passphrase.as_deref())
    }

    pub fn open_token_store_in(&self, cache_dir: &Path, passphrase: Option<&str>) -> Result<TokenStore> {
        debug!(kind = ?self.token_store, "Opening token store");
        let store = match self.token_store {
            StoreKind::File => TokenStore::new(Arc::new(FileStore::in_dir(cache_dir))),
            StoreKind::Sealed => {
                let passphrase = passphrase.ok_or_else(|| {
                    anyhow!("{} must be set to use the sealed token store", ENV_STORE_PASSPHRASE)
                })?;
                TokenStore::new(Arc::new(SealedFileStore::open_in_dir(cache_dir, passphrase)?))
            }
            StoreKind::Keyring => TokenStore::new(Arc::new(KeyringStore::new(self.base_url.clone()))),
            StoreKind::Memory => TokenStore::in_memory(),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.token_store, StoreKind::File);
        assert_eq!(config.client_config().api_root(), "http://localhost:8000/api");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = Config {
            base_url: "https://shop.example.com".into(),
            token_store: StoreKind::Keyring,
            last_username: Some("ada".into()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.base_url, "https://shop.example.com");
        assert_eq!(loaded.token_store, StoreKind::Keyring);
        assert_eq!(loaded.last_username.as_deref(), Some("ada"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"base_url": "http://10.0.0.5:8000"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url, "http://10.0.0.5:8000");
        assert_eq!(config.refresh_timeout_secs, DEFAULT_REFRESH_TIMEOUT_SECS);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                (ENV_API_URL, "https://override.test"),
                (ENV_TOKEN_STORE, "Memory"),
            ]))
            .unwrap();
        assert_eq!(config.base_url, "https://override.test");
        assert_eq!(config.token_store, StoreKind::Memory);
    }

    #[test]
    fn test_bad_store_kind_is_an_error() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(env(&[(ENV_TOKEN_STORE, "floppy")]))
            .is_err());
    }

    #[test]
    fn test_sealed_store_requires_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            token_store: StoreKind::Sealed,
            ..Config::default()
        };
        assert!(config.open_token_store_in(dir.path(), None).is_err());
    }

    #[test]
    fn test_file_store_opens_in_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = Config::default()
            .open_token_store_in(dir.path(), None)
            .unwrap();
        store.set_access_token("T1").unwrap();
        assert!(dir.path().join(crate::auth::file_store::TOKEN_FILE).exists());
    }
}
