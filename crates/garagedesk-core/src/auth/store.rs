use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};

use crate::models::CredentialPair;

/// Storage key for the short-lived access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the long-lived refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// A durable string key-value store.
///
/// Implementations must be safe to call from any task; the API client reads
/// the access token before every request.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        values.remove(key);
        Ok(())
    }
}

/// Typed view of the credential pair held in a [`KeyValueStore`].
/// Clone is cheap - the backend is shared.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        Ok(non_empty(self.backend.get(ACCESS_TOKEN_KEY)?))
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        Ok(non_empty(self.backend.get(REFRESH_TOKEN_KEY)?))
    }

    /// Replace both tokens, as after a successful login.
    pub fn save_pair(&self, pair: &CredentialPair) -> Result<()> {
        self.backend.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.backend.set(REFRESH_TOKEN_KEY, &pair.refresh_token)?;
        Ok(())
    }

    /// Replace the access token in place, keeping the refresh token.
    pub fn set_access_token(&self, token: &str) -> Result<()> {
        self.backend.set(ACCESS_TOKEN_KEY, token)
    }

    pub fn clear(&self) -> Result<()> {
        self.backend.remove(ACCESS_TOKEN_KEY)?;
        self.backend.remove(REFRESH_TOKEN_KEY)?;
        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        matches!(self.refresh_token(), Ok(Some(_)))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_pair_and_read_back() {
        let store = TokenStore::in_memory();
        store
            .save_pair(&CredentialPair::new("T1", "R1"))
            .unwrap();

        assert_eq!(store.access_token().unwrap().as_deref(), Some("T1"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("R1"));
        assert!(store.has_credentials());
    }

    #[test]
    fn test_set_access_token_keeps_refresh_token() {
        let store = TokenStore::in_memory();
        store.save_pair(&CredentialPair::new("T1", "R1")).unwrap();
        store.set_access_token("T2").unwrap();

        assert_eq!(store.access_token().unwrap().as_deref(), Some("T2"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("R1"));
    }

    #[test]
    fn test_clear_removes_both_tokens() {
        let store = TokenStore::in_memory();
        store.save_pair(&CredentialPair::new("T1", "R1")).unwrap();
        store.clear().unwrap();

        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
        assert!(!store.has_credentials());
    }

    #[test]
    fn test_empty_values_read_as_absent() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(ACCESS_TOKEN_KEY, "").unwrap();
        let store = TokenStore::new(backend);
        assert_eq!(store.access_token().unwrap(), None);
    }

    #[test]
    fn test_uses_documented_storage_keys() {
        let backend = Arc::new(MemoryStore::new());
        let store = TokenStore::new(backend.clone());
        store.save_pair(&CredentialPair::new("a", "r")).unwrap();

        assert_eq!(backend.get("accessToken").unwrap().as_deref(), Some("a"));
        assert_eq!(backend.get("refreshToken").unwrap().as_deref(), Some("r"));
    }
}
