use anyhow::{Context, Result};
use keyring::Entry;

use super::store::KeyValueStore;

const SERVICE_NAME: &str = "garagedesk";

/// OS keychain backend. Each key is a separate keychain entry under the
/// `garagedesk` service, scoped by an account name so several backends can
/// be logged in side by side.
pub struct KeyringStore {
    account: String,
}

impl KeyringStore {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry_name(&self, key: &str) -> String {
        format!("{}:{}", self.account, key)
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.entry_name(key)).context("Failed to create keyring entry")
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store token in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStore;
    use crate::models::CredentialPair;
    use std::sync::Arc;

    #[test]
    fn test_entries_are_scoped_by_account() {
        let shop = KeyringStore::new("https://shop.example.com");
        let other = KeyringStore::new("http://localhost:8000");
        assert_eq!(shop.entry_name("accessToken"), "https://shop.example.com:accessToken");
        assert_ne!(shop.entry_name("refreshToken"), other.entry_name("refreshToken"));
    }

    // Needs a running keychain service (Keychain, Credential Manager or a
    // Secret Service daemon). Run with `cargo test -- --ignored`.
    #[test]
    #[ignore = "requires an OS keychain service"]
    fn test_round_trip_through_os_keychain() {
        let account = format!("garagedesk-test-{}", std::process::id());
        let store = KeyringStore::new(account.clone());

        store.set("refreshToken", "R1").unwrap();
        assert_eq!(store.get("refreshToken").unwrap().as_deref(), Some("R1"));

        // A second handle on the same account sees the same entries.
        let tokens = TokenStore::new(Arc::new(KeyringStore::new(account)));
        tokens.save_pair(&CredentialPair::new("T1", "R2")).unwrap();
        assert_eq!(store.get("accessToken").unwrap().as_deref(), Some("T1"));
        assert_eq!(store.get("refreshToken").unwrap().as_deref(), Some("R2"));

        tokens.clear().unwrap();
        assert_eq!(store.get("accessToken").unwrap(), None);
        assert_eq!(store.get("refreshToken").unwrap(), None);
        store.remove("refreshToken").unwrap();
    }
}
