//! Secure key-value stores for the session credential.
//!
//! The session manager only ever touches one key (`TOKEN_KEY`), but the
//! stores are general so other small secrets can live next to it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use argon2::Argon2;
use async_trait::async_trait;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use keyring::credential::{CredentialBuilderApi, CredentialPersistence};
use keyring::Entry;
use rand::RngCore;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "auth_token";

/// Keychain service name
const SERVICE_NAME: &str = "electree";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// File extension for encrypted entries
const ENTRY_EXTENSION: &str = "enc";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encryption error: {0}")]
    Crypto(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Key-value persistence with at-rest protection.
///
/// `delete` on a missing key must succeed.
#[async_trait]
pub trait SecureStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Run keychain calls, key derivation and file I/O off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

// ============================================================================
// OS keychain
// ============================================================================

/// Store backed by the OS keychain (Keychain, Credential Manager, kernel keyutils).
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Whether the platform keychain keeps a secret beyond the entry that wrote it.
    ///
    /// Without a native backend the keyring crate falls back to a mock where
    /// every entry is independent, so a stored token would be gone on the next read.
    pub fn is_persistent() -> bool {
        !matches!(
            keyring::default::default_credential_builder().persistence(),
            CredentialPersistence::EntryOnly | CredentialPersistence::ProcessOnly
        )
    }

    fn entry(service: &str, key: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(service, key)?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecureStore for KeyringStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (service, key, value) = (self.service.clone(), key.to_string(), value.to_string());
        run_blocking(move || {
            Self::entry(&service, &key)?.set_password(&value)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let (service, key) = (self.service.clone(), key.to_string());
        run_blocking(move || match Self::entry(&service, &key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let (service, key) = (self.service.clone(), key.to_string());
        run_blocking(move || match Self::entry(&service, &key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        })
        .await
    }
}

// ============================================================================
// Encrypted files
// ============================================================================

/// Store keeping one encrypted file per key.
///
/// Layout of each file: `salt (16) | nonce (12) | ciphertext`. The cipher
/// key is derived from the passphrase with Argon2 using the file's salt,
/// and both salt and nonce are fresh on every write.
#[derive(Clone)]
pub struct EncryptedFileStore {
    dir: PathBuf,
    passphrase: Arc<str>,
}

impl EncryptedFileStore {
    pub fn new(dir: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        let passphrase: String = passphrase.into();
        Self {
            dir: dir.into(),
            passphrase: Arc::from(passphrase),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", key, ENTRY_EXTENSION)))
    }

    fn cipher(&self, salt: &[u8]) -> Result<ChaCha20Poly1305, StoreError> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(self.passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| StoreError::Crypto(format!("key derivation failed: {}", e)))?;
        Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher(&salt)?
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| StoreError::Crypto("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, StoreError> {
        if sealed.len() < SALT_LEN + NONCE_LEN {
            return Err(StoreError::Crypto("entry is truncated".to_string()));
        }
        let (salt, rest) = sealed.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        self.cipher(salt)?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| StoreError::Crypto("decryption failed (wrong passphrase or corrupt entry)".to_string()))
    }

    fn write_entry(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        fs::create_dir_all(&self.dir)?;

        let sealed = self.seal(value.as_bytes())?;

        // Write then rename so a reader never sees a half-written entry
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, sealed)?;
        fs::rename(&tmp, &path)?;
        debug!(key = key, "Stored encrypted entry");
        Ok(())
    }

    fn read_entry(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.entry_path(key)?;
        let sealed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let plaintext = self.open(&sealed)?;
        String::from_utf8(plaintext)
            .map(Some)
            .map_err(|_| StoreError::Crypto("entry is not valid UTF-8".to_string()))
    }

    fn remove_entry(&self, key: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SecureStore for EncryptedFileStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (store, key, value) = (self.clone(), key.to_string(), value.to_string());
        run_blocking(move || store.write_entry(&key, &value)).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let (store, key) = (self.clone(), key.to_string());
        run_blocking(move || store.read_entry(&key)).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let (store, key) = (self.clone(), key.to_string());
        run_blocking(move || store.remove_entry(&key)).await
    }
}

// ============================================================================
// In memory
// ============================================================================

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
