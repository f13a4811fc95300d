//! Persistent storage for the single StaffPortal auth token.
//!
//! Only one token is ever held: `set` overwrites, `delete` is idempotent.
//! The OS keychain is the default backend; see
//! [`EncryptedFileStore`](super::EncryptedFileStore) for hosts without one.

use std::sync::Mutex;

use keyring::Entry;
use thiserror::Error;

/// Keychain service name
pub const SERVICE_NAME: &str = "staffportal";

/// Key under which the token is stored
pub const TOKEN_KEY: &str = "auth_token";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Token file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to derive storage key: {0}")]
    KeyDerivation(String),

    #[error("Stored token could not be decrypted")]
    Decrypt,

    #[error("Stored token is corrupt: {0}")]
    Corrupt(String),
}

/// Backend-agnostic access to the stored token.
///
/// Implementations give last-write-wins semantics and nothing stronger.
pub trait CredentialStore: Send + Sync {
    /// Read the current token, if any
    fn get(&self) -> Result<Option<String>, CredentialError>;

    /// Store a token, replacing any previous one
    fn set(&self, token: &str) -> Result<(), CredentialError>;

    /// Remove the token. Succeeds when nothing is stored.
    fn delete(&self) -> Result<(), CredentialError>;
}

/// Token storage in the OS keychain.
pub struct KeyringStore {
    entry: Entry,
}

impl KeyringStore {
    /// Open the default `staffportal` / `auth_token` entry
    pub fn new() -> Result<Self, CredentialError> {
        Self::with_service(SERVICE_NAME)
    }

    /// Open the token entry under a custom service name
    pub fn with_service(service: &str) -> Result<Self, CredentialError> {
        let entry = Entry::new(service, TOKEN_KEY)?;
        Ok(Self { entry })
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self) -> Result<Option<String>, CredentialError> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, token: &str) -> Result<(), CredentialError> {
        self.entry.set_password(token)?;
        Ok(())
    }

    fn delete(&self) -> Result<(), CredentialError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process token storage. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    token: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned lock still holds a valid Option
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.slot().clone())
    }

    fn set(&self, token: &str) -> Result<(), CredentialError> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<(), CredentialError> {
        *self.slot() = None;
        Ok(())
    }
}
