//! Passphrase-sealed token file.
//!
//! The key-value map is serialized to JSON and encrypted with
//! ChaCha20-Poly1305. The key is derived from the passphrase with Argon2id
//! and a per-file random salt; every write uses a fresh nonce.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::file_store::write_private;
use super::store::KeyValueStore;

/// Sealed token file name in cache directory
pub const SEALED_TOKEN_FILE: &str = "tokens.sealed";

const ENVELOPE_VERSION: u32 = 1;
const ALGORITHM: &str = "ChaCha20-Poly1305/Argon2id";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Argon2 memory cost in KiB (the argon2 crate's default)
const DEFAULT_MEMORY_KIB: u32 = 19 * 1024;
const DEFAULT_ITERATIONS: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    algorithm: String,
    memory_kib: u32,
    iterations: u32,
    salt: Vec<u8>,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
}

struct SealedState {
    cipher: ChaCha20Poly1305,
    salt: [u8; SALT_LEN],
    memory_kib: u32,
    iterations: u32,
    values: BTreeMap<String, String>,
}

pub struct SealedFileStore {
    path: PathBuf,
    state: Mutex<SealedState>,
}

impl std::fmt::Debug for SealedFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedFileStore")
            .field("path", &self.path)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SealedFileStore {
    /// Open (or start) a sealed store at `<cache_dir>/tokens.sealed`.
    pub fn open_in_dir(cache_dir: &Path, passphrase: &str) -> Result<Self> {
        Self::open(cache_dir.join(SEALED_TOKEN_FILE), passphrase)
    }

    /// Open an existing sealed file, or prepare a new one if it does not
    /// exist. A wrong passphrase is an error.
    pub fn open(path: PathBuf, passphrase: &str) -> Result<Self> {
        Self::open_with_cost(path, passphrase, DEFAULT_MEMORY_KIB, DEFAULT_ITERATIONS)
    }

    pub(crate) fn open_with_cost(
        path: PathBuf,
        passphrase: &str,
        memory_kib: u32,
        iterations: u32,
    ) -> Result<Self> {
        if passphrase.is_empty() {
            bail!("Sealed token store requires a non-empty passphrase");
        }

        let state = if path.exists() {
            let contents = std::fs::read(&path)
                .with_context(|| format!("Failed to read sealed token file {}", path.display()))?;
            let envelope: Envelope =
                serde_json::from_slice(&contents).context("Failed to parse sealed token file")?;
            unseal(envelope, passphrase)?
        } else {
            let mut salt = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut salt);
            let cipher = derive_cipher(passphrase, &salt, memory_kib, iterations)?;
            SealedState {
                cipher,
                salt,
                memory_kib,
                iterations,
                values: BTreeMap::new(),
            }
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &SealedState) -> Result<()> {
        let plaintext = serde_json::to_vec(&state.values)?;
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = state
            .cipher
            .encrypt(&Nonce::from(nonce), plaintext.as_ref())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            algorithm: ALGORITHM.to_string(),
            memory_kib: state.memory_kib,
            iterations: state.iterations,
            salt: state.salt.to_vec(),
            nonce: nonce.to_vec(),
            ciphertext,
        };
        debug!(path = %self.path.display(), entries = state.values.len(), "Sealing token file");
        write_private(&self.path, &serde_json::to_vec(&envelope)?)
    }
}

impl KeyValueStore for SealedFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow!("sealed store lock poisoned"))?;
        Ok(state.values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("sealed store lock poisoned"))?;
        state.values.insert(key.to_string(), value.to_string());
        self.persist(&state)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("sealed store lock poisoned"))?;
        if state.values.remove(key).is_some() {
            self.persist(&state)?;
        }
        Ok(())
    }
}

fn derive_cipher(
    passphrase: &str,
    salt: &[u8],
    memory_kib: u32,
    iterations: u32,
) -> Result<ChaCha20Poly1305> {
    let params = Params::new(memory_kib, iterations, 1, Some(KEY_LEN))
        .map_err(|e| anyhow!("Invalid key derivation parameters: {}", e))?;
    let mut key = [0u8; KEY_LEN];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| anyhow!("Key derivation failed: {}", e))?;
    Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
}

fn unseal(envelope: Envelope, passphrase: &str) -> Result<SealedState> {
    if envelope.version != ENVELOPE_VERSION {
        bail!("Unsupported sealed token file version {}", envelope.version);
    }
    let salt: [u8; SALT_LEN] = envelope
        .salt
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("Sealed token file has a malformed salt"))?;
    if envelope.algorithm != ALGORITHM {
        bail!("Unsupported sealed token file algorithm: {}", envelope.algorithm);
    }
    let nonce: [u8; NONCE_LEN] = envelope
        .nonce
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("Sealed token file has a malformed nonce"))?;

    let cipher = derive_cipher(passphrase, &salt, envelope.memory_kib, envelope.iterations)?;
    let plaintext = cipher
        .decrypt(&Nonce::from(nonce), envelope.ciphertext.as_ref())
        .map_err(|_| anyhow!("Failed to unseal token file - wrong passphrase or corrupted file"))?;
    let values = serde_json::from_slice(&plaintext).context("Sealed token file has invalid contents")?;

    Ok(SealedState {
        cipher,
        salt,
        memory_kib: envelope.memory_kib,
        iterations: envelope.iterations,
        values,
    })
}
