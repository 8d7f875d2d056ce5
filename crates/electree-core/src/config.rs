//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the backend URL, request timeout, which secure store backs the session,
//! and the last email used to log in.
//!
//! Configuration is stored at `~/.config/electree/config.json`. The
//! `ELECTREE_API_URL` environment variable overrides the backend URL for the
//! running process only; the CLI writes back nothing but `last_email`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_TIMEOUT_SECS;
use crate::auth::{EncryptedFileStore, KeyringStore, SecureStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "electree";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Directory under the data dir holding encrypted store entries
const SECURE_DIR: &str = "secure";

const DEFAULT_API_BASE_URL: &str = "http://localhost:4000";

pub const ENV_API_URL: &str = "ELECTREE_API_URL";
pub const ENV_STORE_PASSPHRASE: &str = "ELECTREE_STORE_PASSPHRASE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreBackend {
    /// OS keychain
    #[default]
    Keyring,
    /// Encrypted files; passphrase comes from `ELECTREE_STORE_PASSPHRASE`
    EncryptedFile { dir: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub store: StoreBackend,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            store: StoreBackend::default(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Record the email of the last successful login in the config file.
    pub fn remember_last_email(email: &str) -> Result<()> {
        Self::remember_last_email_at(&Self::config_path()?, email)
    }

    /// Reloads the file at `path` before writing, so overrides applied to an
    /// in-memory config never end up on disk.
    pub fn remember_last_email_at(path: &Path, email: &str) -> Result<()> {
        let mut stored = Self::load_from(path)?;
        stored.last_email = Some(email.to_string());
        stored.save_to(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn secure_dir(&self) -> Result<PathBuf> {
        if let StoreBackend::EncryptedFile { dir: Some(ref dir) } = self.store {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(SECURE_DIR))
    }

    /// Open the configured secure store.
    pub fn open_store(&self) -> Result<Arc<dyn SecureStore>> {
        self.open_store_with(|key| std::env::var(key).ok())
    }

    pub fn open_store_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Arc<dyn SecureStore>> {
        match self.store {
            StoreBackend::Keyring => {
                if !KeyringStore::is_persistent() {
                    anyhow::bail!(
                        "No OS keychain is available on this platform; set the store backend to encrypted_file"
                    );
                }
                Ok(Arc::new(KeyringStore::new()))
            }
            StoreBackend::EncryptedFile { .. } => {
                let passphrase = lookup(ENV_STORE_PASSPHRASE)
                    .filter(|p| !p.is_empty())
                    .with_context(|| {
                        format!("{} must be set to use the encrypted file store", ENV_STORE_PASSPHRASE)
                    })?;
                Ok(Arc::new(EncryptedFileStore::new(self.secure_dir()?, passphrase)))
            }
        }
    }
}
