//! Authentication module for managing the session and the stored token.
//!
//! This module provides:
//! - `CredentialStore`: the single-token store, backed by the OS keychain
//!   (`KeyringStore`), a passphrase-encrypted file (`EncryptedFileStore`)
//!   or memory (`MemoryStore`)
//! - `SessionController`: startup verification, login and logout
//!
//! Session state is never persisted; it is recomputed from the token.

pub mod credentials;
pub mod encrypted;
pub mod session;

pub use credentials::{CredentialError, CredentialStore, KeyringStore, MemoryStore};
pub use encrypted::EncryptedFileStore;
pub use session::{Session, SessionController, SessionState};
