//! Passphrase-encrypted token file for hosts without an OS keychain.
//!
//! File layout: `salt (16) || nonce (12) || ciphertext`. The key is derived
//! from the passphrase with Argon2id and a fresh salt on every write; the
//! token is sealed with ChaCha20-Poly1305. The last derived key is kept in
//! memory with its salt, so repeated reads of an unchanged file skip Argon2.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use tracing::debug;

use super::credentials::{CredentialError, CredentialStore};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

type CachedKey = ([u8; SALT_LEN], [u8; KEY_LEN]);

pub struct EncryptedFileStore {
    path: PathBuf,
    passphrase: String,
    key_cache: Mutex<Option<CachedKey>>,
}

impl EncryptedFileStore {
    pub fn new(path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            passphrase: passphrase.into(),
            key_cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cache(&self) -> MutexGuard<'_, Option<CachedKey>> {
        self.key_cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn derive_key(&self, salt: &[u8]) -> Result<[u8; KEY_LEN], CredentialError> {
        if let Some((cached_salt, key)) = self.cache().as_ref() {
            if cached_salt.as_slice() == salt {
                return Ok(*key);
            }
        }

        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(self.passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| CredentialError::KeyDerivation(e.to_string()))?;

        let mut cached_salt = [0u8; SALT_LEN];
        cached_salt.copy_from_slice(salt);
        *self.cache() = Some((cached_salt, key));
        Ok(key)
    }

    fn seal(&self, token: &str) -> Result<Vec<u8>, CredentialError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let key = self.derive_key(&salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), token.as_bytes())
            .map_err(|_| CredentialError::Corrupt("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn open(&self, data: &[u8]) -> Result<String, CredentialError> {
        if data.len() <= SALT_LEN + NONCE_LEN {
            return Err(CredentialError::Corrupt(format!(
                "file too short ({} bytes)",
                data.len()
            )));
        }
        let (salt, rest) = data.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let key = self.derive_key(salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CredentialError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|e| CredentialError::Corrupt(e.to_string()))
    }

    fn write_atomic(&self, contents: &[u8]) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for EncryptedFileStore {
    fn get(&self) -> Result<Option<String>, CredentialError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        self.open(&data).map(Some)
    }

    fn set(&self, token: &str) -> Result<(), CredentialError> {
        let sealed = self.seal(token)?;
        self.write_atomic(&sealed)?;
        debug!(path = %self.path.display(), "Token written to encrypted file");
        Ok(())
    }

    fn delete(&self) -> Result<(), CredentialError> {
        *self.cache() = None;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir, passphrase: &str) -> EncryptedFileStore {
        EncryptedFileStore::new(dir.path().join("staffportal").join("token.bin"), passphrase)
    }

    #[test]
    fn test_set_then_get_returns_last_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "correct horse");

        assert_eq!(store.get().unwrap(), None);
        store.set("first-token").unwrap();
        store.set("second-token").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("second-token"));
    }

    #[test]
    fn test_token_is_not_stored_in_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "correct horse");
        store.set("very-secret-token").unwrap();

        let raw = fs::read(store.path()).unwrap();
        let needle = b"very-secret-token";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_wrong_passphrase_fails_to_decrypt() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir, "right").set("tok").unwrap();

        let err = store_in(&dir, "wrong").get().unwrap_err();
        assert!(matches!(err, CredentialError::Decrypt));
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "pw");
        store.set("tok").unwrap();
        fs::write(store.path(), [0u8; 10]).unwrap();

        assert!(matches!(store.get(), Err(CredentialError::Corrupt(_))));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "pw");

        store.delete().unwrap();
        store.set("tok").unwrap();
        store.delete().unwrap();
        store.delete().unwrap();
        assert_eq!(store.get().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_key_is_cached_for_current_salt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "pw");
        store.set("tok").unwrap();

        let raw = fs::read(store.path()).unwrap();
        let cached = *store.cache();
        let cached_salt = cached.map(|(salt, _)| salt);
        assert_eq!(cached_salt.as_ref().map(|s| s.as_slice()), Some(&raw[..SALT_LEN]));

        // The wrong passphrase still opens the file when the cached key is used
        let reader = EncryptedFileStore {
            path: store.path().to_path_buf(),
            passphrase: "not-the-passphrase".to_string(),
            key_cache: Mutex::new(cached),
        };
        assert_eq!(reader.get().unwrap().as_deref(), Some("tok"));

        store.delete().unwrap();
        assert!(store.cache().is_none());
    }

    #[test]
    fn test_new_salt_rederives_key() {
        let dir = tempfile::tempdir().unwrap();
        let writer = store_in(&dir, "pw");
        let reader = store_in(&dir, "pw");

        writer.set("first").unwrap();
        assert_eq!(reader.get().unwrap().as_deref(), Some("first"));
        writer.set("second").unwrap();
        assert_eq!(reader.get().unwrap().as_deref(), Some("second"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "pw");
        store.set("tok").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
