//! Application configuration management.
//!
//! Configuration is stored at `~/.config/staffportal/config.json` and can be
//! overridden with `STAFFPORTAL_*` environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::ApiClient;
use crate::auth::{CredentialStore, EncryptedFileStore, KeyringStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "staffportal";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Encrypted token file name in the data directory
const TOKEN_FILE: &str = "token.bin";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

pub const ENV_API_URL: &str = "STAFFPORTAL_API_URL";
pub const ENV_CREDENTIAL_BACKEND: &str = "STAFFPORTAL_CREDENTIAL_BACKEND";
pub const ENV_STORE_PASSPHRASE: &str = "STAFFPORTAL_STORE_PASSPHRASE";

/// Where the auth token is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialBackend {
    /// OS keychain
    #[default]
    Keyring,
    /// Passphrase-encrypted file in the data directory
    EncryptedFile,
}

impl FromStr for CredentialBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keyring" => Ok(CredentialBackend::Keyring),
            "encrypted-file" | "file" => Ok(CredentialBackend::EncryptedFile),
            other => Err(anyhow::anyhow!("Unknown credential backend: {}", other)),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    #[serde(default)]
    pub last_email: Option<String>,
    /// Only ever taken from the environment
    #[serde(skip)]
    pub store_passphrase: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            credential_backend: CredentialBackend::default(),
            last_email: None,
            store_passphrase: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
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

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(backend) = lookup(ENV_CREDENTIAL_BACKEND) {
            self.credential_backend = backend
                .parse()
                .with_context(|| format!("Invalid {}", ENV_CREDENTIAL_BACKEND))?;
        }
        if let Some(passphrase) = lookup(ENV_STORE_PASSPHRASE) {
            self.store_passphrase = Some(passphrase);
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn token_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(TOKEN_FILE))
    }

    /// Open the configured credential store
    pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
        match self.credential_backend {
            CredentialBackend::Keyring => {
                let store = KeyringStore::new().context("Failed to open keychain entry")?;
                Ok(Arc::new(store))
            }
            CredentialBackend::EncryptedFile => {
                let passphrase = self.store_passphrase.clone().ok_or_else(|| {
                    anyhow::anyhow!(
                        "{} must be set to use the encrypted-file credential backend",
                        ENV_STORE_PASSPHRASE
                    )
                })?;
                Ok(Arc::new(EncryptedFileStore::new(Self::token_path()?, passphrase)))
            }
        }
    }

    /// Build an API client wired to the configured credential store
    pub fn api_client(&self) -> Result<ApiClient> {
        let store = self.credential_store()?;
        ApiClient::new(&self.api_base_url, store).context("Failed to create HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
        assert!(config.last_email.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            api_base_url: "https://portal.example.com".to_string(),
            credential_backend: CredentialBackend::EncryptedFile,
            last_email: Some("a@b.com".to_string()),
            store_passphrase: Some("secret".to_string()),
        };
        config.save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("encrypted-file"));
        assert!(!contents.contains("secret"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, "https://portal.example.com");
        assert_eq!(loaded.credential_backend, CredentialBackend::EncryptedFile);
        assert_eq!(loaded.last_email.as_deref(), Some("a@b.com"));
        assert!(loaded.store_passphrase.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                (ENV_API_URL, " https://staging.example.com "),
                (ENV_CREDENTIAL_BACKEND, "file"),
                (ENV_STORE_PASSPHRASE, "pw"),
            ]))
            .unwrap();
        assert_eq!(config.api_base_url, "https://staging.example.com");
        assert_eq!(config.credential_backend, CredentialBackend::EncryptedFile);
        assert_eq!(config.store_passphrase.as_deref(), Some("pw"));
    }

    #[test]
    fn test_invalid_backend_is_an_error() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(env(&[(ENV_CREDENTIAL_BACKEND, "floppy")]))
            .is_err());
    }

    #[test]
    fn test_encrypted_backend_requires_passphrase() {
        let config = Config {
            credential_backend: CredentialBackend::EncryptedFile,
            ..Config::default()
        };
        assert!(config.credential_store().is_err());
    }
}
