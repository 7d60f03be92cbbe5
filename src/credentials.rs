//! On-disk credential cache.
//!
//! Holds at most one access credential and one refresh credential at a
//! time, mirrored to a JSON file so a session survives process restarts
//! on the same machine profile. The in-memory copy is authoritative for
//! the running process; disk persistence is a side effect and a failed
//! write is reported on stderr rather than failing the auth flow that
//! produced the tokens.

use std::path::PathBuf;
use std::sync::RwLock;

use crate::models::TokenPair;

pub struct CredentialStore {
    path: PathBuf,
    inner: RwLock<Option<TokenPair>>,
}

impl CredentialStore {
    /// Open the store, loading any cached pair from disk. A missing or
    /// unreadable file is treated as "no credentials".
    pub fn open(path: PathBuf) -> Self {
        let cached = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str::<TokenPair>(&text).ok());
        Self {
            path,
            inner: RwLock::new(cached),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.inner.read().expect("credential lock poisoned").is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .expect("credential lock poisoned")
            .as_ref()
            .map(|pair| pair.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner
            .read()
            .expect("credential lock poisoned")
            .as_ref()
            .map(|pair| pair.refresh_token.clone())
    }

    /// Replace the cached pair. The previous pair is dropped; there is
    /// never more than one of each credential.
    pub fn store(&self, pair: TokenPair) {
        {
            let mut guard = self.inner.write().expect("credential lock poisoned");
            *guard = Some(pair);
        }
        if let Err(e) = self.persist() {
            eprintln!(
                "warning: failed to persist credentials to {}: {}",
                self.path.display(),
                e
            );
        }
    }

    /// Drop all cached credentials. Always succeeds locally; removing the
    /// cache file is best effort.
    pub fn clear(&self) {
        {
            let mut guard = self.inner.write().expect("credential lock poisoned");
            *guard = None;
        }
        if self.path.exists() {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn persist(&self) -> std::io::Result<()> {
        let guard = self.inner.read().expect("credential lock poisoned");
        let Some(ref pair) = *guard else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(pair)?;
        std::fs::write(&self.path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            token_type: "bearer".to_string(),
        }
    }

    #[test]
    fn test_store_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("credentials.json");

        let store = CredentialStore::open(path.clone());
        assert!(!store.has_credentials());

        store.store(pair("acc-1", "ref-1"));
        assert_eq!(store.access_token().as_deref(), Some("acc-1"));
        assert_eq!(store.refresh_token().as_deref(), Some("ref-1"));

        // A fresh store sees what the previous process wrote.
        let reloaded = CredentialStore::open(path);
        assert_eq!(reloaded.access_token().as_deref(), Some("acc-1"));
    }

    #[test]
    fn test_store_replaces_previous_pair() {
        let tmp = TempDir::new().unwrap();
        let store = CredentialStore::open(tmp.path().join("credentials.json"));

        store.store(pair("acc-1", "ref-1"));
        store.store(pair("acc-2", "ref-2"));
        assert_eq!(store.access_token().as_deref(), Some("acc-2"));
        assert_eq!(store.refresh_token().as_deref(), Some("ref-2"));
    }

    #[test]
    fn test_clear_removes_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("credentials.json");
        let store = CredentialStore::open(path.clone());

        store.store(pair("acc", "ref"));
        assert!(path.exists());

        store.clear();
        assert!(!store.has_credentials());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_treated_as_absent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("credentials.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = CredentialStore::open(path);
        assert!(!store.has_credentials());
        assert!(store.access_token().is_none());
    }
}
