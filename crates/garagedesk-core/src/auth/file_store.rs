use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use super::store::KeyValueStore;

/// Token file name in cache directory
pub const TOKEN_FILE: &str = "tokens.json";

/// Plain JSON key-value file.
///
/// Every `set`/`remove` rewrites the whole file; the mutex serializes
/// read-modify-write cycles within the process.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Store at `<cache_dir>/tokens.json`
    pub fn in_dir(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(TOKEN_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).context("Failed to parse token file")
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        write_private(&self.path, serde_json::to_string_pretty(values)?.as_bytes())
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("token file lock poisoned"))?;
        let mut values = self.load()?;
        f(&mut values);
        self.save(&values)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("token file lock poisoned"))?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!(key, path = %self.path.display(), "Writing token file entry");
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// Write a file readable only by the current user where the platform
/// supports it.
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    // On Unix, owner read/write only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStore;
    use crate::models::CredentialPair;
    use std::sync::Arc;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());
        assert_eq!(store.get("accessToken").unwrap(), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let tokens = TokenStore::new(Arc::new(FileStore::in_dir(dir.path())));
            tokens.save_pair(&CredentialPair::new("T1", "R1")).unwrap();
        }

        let reopened = TokenStore::new(Arc::new(FileStore::in_dir(dir.path())));
        assert_eq!(reopened.access_token().unwrap().as_deref(), Some("T1"));
        assert_eq!(reopened.refresh_token().unwrap().as_deref(), Some("R1"));
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("deeper").join(TOKEN_FILE));
        store.set("refreshToken", "R1").unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_remove_only_touches_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());
        store.set("accessToken", "T1").unwrap();
        store.set("refreshToken", "R1").unwrap();
        store.remove("accessToken").unwrap();

        assert_eq!(store.get("accessToken").unwrap(), None);
        assert_eq!(store.get("refreshToken").unwrap().as_deref(), Some("R1"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOKEN_FILE), "not json").unwrap();
        let store = FileStore::in_dir(dir.path());
        assert!(store.get("accessToken").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());
        store.set("accessToken", "T1").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
