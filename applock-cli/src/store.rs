//! JSON-file backed credential and preference store.
//!
//! Stands in for the Keychain/`UserDefaults` pair of a real host. Secrets are
//! stored in clear text: development use only.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use applock_core::platform::{CredentialStore, PreferenceStore};
use applock_core::{AppLockError, AppLockResult};
use eyre::WrapErr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreFile {
    /// Secrets by service, then account.
    #[serde(default)]
    credentials: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    preferences: BTreeMap<String, bool>,
}

/// Store persisted to a single JSON file, rewritten atomically on every change.
///
/// A change is only visible to readers once it is on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    contents: Mutex<StoreFile>,
}

impl FileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> eyre::Result<Self> {
        let path = path.into();
        let contents = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .wrap_err_with(|| format!("malformed store file {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(err) => {
                return Err(err).wrap_err_with(|| format!("cannot read {}", path.display()))
            }
        };
        Ok(Self {
            path,
            contents: Mutex::new(contents),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn contents(&self) -> MutexGuard<'_, StoreFile> {
        self.contents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` to a copy of the contents and keeps it only if the
    /// copy was written. `change` returns false when there is nothing to write.
    fn update(&self, change: impl FnOnce(&mut StoreFile) -> bool) -> Result<(), String> {
        let mut contents = self.contents();
        let mut next = contents.clone();
        if change(&mut next) {
            self.persist(&next)?;
            *contents = next;
        }
        Ok(())
    }

    fn persist(&self, contents: &StoreFile) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| err.to_string())?;
        }
        let bytes = serde_json::to_vec_pretty(contents).map_err(|err| err.to_string())?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|err| err.to_string())?;
        fs::rename(&tmp, &self.path).map_err(|err| err.to_string())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, service: String, account: String) -> AppLockResult<Option<String>> {
        Ok(self
            .contents()
            .credentials
            .get(&service)
            .and_then(|accounts| accounts.get(&account))
            .cloned())
    }

    fn set(&self, service: String, account: String, secret: String) -> AppLockResult<()> {
        self.update(|contents| {
            contents
                .credentials
                .entry(service)
                .or_default()
                .insert(account, secret);
            true
        })
        .map_err(AppLockError::CredentialStore)
    }

    fn delete(&self, service: String, account: String) -> AppLockResult<()> {
        self.update(|contents| {
            let Some(accounts) = contents.credentials.get_mut(&service) else {
                return false;
            };
            let removed = accounts.remove(&account).is_some();
            if accounts.is_empty() {
                contents.credentials.remove(&service);
            }
            removed
        })
        .map_err(AppLockError::CredentialStore)
    }
}

impl PreferenceStore for FileStore {
    fn get_bool(&self, key: String) -> AppLockResult<Option<bool>> {
        Ok(self.contents().preferences.get(&key).copied())
    }

    fn set_bool(&self, key: String, value: bool) -> AppLockResult<()> {
        self.update(|contents| {
            contents.preferences.insert(key, value);
            true
        })
        .map_err(AppLockError::PreferenceStore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("applock.json");

        let store = FileStore::open(&path).unwrap();
        store
            .set("svc".to_string(), "acct".to_string(), "1234".to_string())
            .unwrap();
        store.set_bool("main.biometrics_enabled".to_string(), false).unwrap();
        drop(store);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(
            store.get("svc".to_string(), "acct".to_string()).unwrap().as_deref(),
            Some("1234")
        );
        assert_eq!(
            store.get_bool("main.biometrics_enabled".to_string()).unwrap(),
            Some(false)
        );
        assert_eq!(store.get("svc".to_string(), "other".to_string()).unwrap(), None);
    }

    #[test]
    fn test_delete_removes_secret() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("applock.json")).unwrap();
        store
            .set("svc".to_string(), "acct".to_string(), "1234".to_string())
            .unwrap();
        store.delete("svc".to_string(), "acct".to_string()).unwrap();
        store.delete("svc".to_string(), "acct".to_string()).unwrap();
        assert_eq!(store.get("svc".to_string(), "acct".to_string()).unwrap(), None);
    }

    #[test]
    fn test_service_and_account_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("applock.json")).unwrap();
        store
            .set("a/b".to_string(), "c".to_string(), "one".to_string())
            .unwrap();
        assert_eq!(store.get("a".to_string(), "b/c".to_string()).unwrap(), None);

        store
            .set("a".to_string(), "b/c".to_string(), "two".to_string())
            .unwrap();
        store.delete("a".to_string(), "b/c".to_string()).unwrap();
        assert_eq!(
            store.get("a/b".to_string(), "c".to_string()).unwrap().as_deref(),
            Some("one")
        );
    }

    #[test]
    fn test_failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applock.json");
        let store = FileStore::open(&path).unwrap();
        store
            .set("svc".to_string(), "acct".to_string(), "1234".to_string())
            .unwrap();
        fs::create_dir(path.with_extension("json.tmp")).unwrap();

        assert!(matches!(
            store.set("svc".to_string(), "acct".to_string(), "5678".to_string()),
            Err(AppLockError::CredentialStore(_))
        ));
        assert!(store.set("svc".to_string(), "new".to_string(), "0000".to_string()).is_err());
        assert!(store.delete("svc".to_string(), "acct".to_string()).is_err());
        assert!(matches!(
            store.set_bool("main.biometrics_enabled".to_string(), false),
            Err(AppLockError::PreferenceStore(_))
        ));

        assert_eq!(
            store.get("svc".to_string(), "acct".to_string()).unwrap().as_deref(),
            Some("1234")
        );
        assert_eq!(store.get("svc".to_string(), "new".to_string()).unwrap(), None);
        assert_eq!(store.get_bool("main.biometrics_enabled".to_string()).unwrap(), None);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("svc".to_string(), "acct".to_string()).unwrap().as_deref(),
            Some("1234")
        );
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applock.json");
        fs::write(&path, b"not json").unwrap();
        assert!(FileStore::open(&path).is_err());
    }
}
