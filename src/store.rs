//! Local and session storage for the current token and user profile

use agency_protocol::UserProfile;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, SessionError};
use crate::token::SessionToken;

/// Local storage key of the session token
pub const TOKEN_KEY: &str = "token";
/// Local storage key of the JSON-encoded user profile
pub const USER_KEY: &str = "user";

/// A string key/value area, the shape of browser `localStorage`.
pub trait Storage: Send + Sync + Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-lifetime storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        lock(&self.entries).clear();
        Ok(())
    }
}

/// Storage persisted as a JSON object in a single file
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = Self::load(&path)?;
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SessionError::io_from_error("Failed to read local storage", e))?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            SessionError::storage_read(
                "Failed to parse local storage",
                format!("{}: {}", path.display(), e),
            )
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SessionError::storage_write("Failed to create storage directory", e)
            })?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content)
            .map_err(|e| SessionError::storage_write("Failed to write local storage", e))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = lock(&self.entries);
        entries.clear();
        self.save(&entries)
    }
}

/// The persistent local area and the ephemeral session area, as one unit.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    local: Arc<dyn Storage>,
    session: Arc<dyn Storage>,
}

impl SessionStorage {
    pub fn new(local: Arc<dyn Storage>, session: Arc<dyn Storage>) -> Self {
        Self { local, session }
    }

    /// File-backed local area at `local_path`, in-memory session area.
    pub fn open(local_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(
            Arc::new(FileStorage::open(local_path)?),
            Arc::new(MemoryStorage::new()),
        ))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    pub fn local(&self) -> &dyn Storage {
        self.local.as_ref()
    }

    pub fn session(&self) -> &dyn Storage {
        self.session.as_ref()
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.local.get(TOKEN_KEY).and_then(SessionToken::new)
    }

    pub fn set_token(&self, token: &SessionToken) -> Result<()> {
        self.local.set(TOKEN_KEY, token.as_str())
    }

    pub fn user_raw(&self) -> Option<String> {
        self.local.get(USER_KEY).filter(|u| !u.trim().is_empty())
    }

    /// The stored profile, or `None` when absent or malformed.
    pub fn user(&self) -> Option<UserProfile> {
        self.user_raw()
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    pub fn set_user(&self, user: &UserProfile) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.local.set(USER_KEY, &raw)
    }

    /// Clear both areas wholesale. Both are attempted even if the first fails.
    pub fn clear_all(&self) -> Result<()> {
        let local = self.local.clear();
        let session = self.session.clear();
        local.and(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::test_helpers::{create_temp_dir, sample_profile};

    #[test]
    fn test_file_storage_persists_across_opens() {
        let dir = create_temp_dir();
        let path = dir.path().join("nested").join("local.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set(TOKEN_KEY, "abc").unwrap();
        storage.set("theme", "dark").unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get(TOKEN_KEY).as_deref(), Some("abc"));
        assert_eq!(reopened.get("theme").as_deref(), Some("dark"));

        reopened.clear().unwrap();
        let again = FileStorage::open(&path).unwrap();
        assert!(again.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let dir = create_temp_dir();
        let path = dir.path().join("local.json");
        fs::write(&path, "{not json").unwrap();
        assert!(FileStorage::open(&path).is_err());
    }

    #[test]
    fn test_empty_file_is_empty_storage() {
        let dir = create_temp_dir();
        let path = dir.path().join("local.json");
        fs::write(&path, "\n").unwrap();
        let storage = FileStorage::open(&path).unwrap();
        assert!(storage.get(USER_KEY).is_none());
    }

    #[test]
    fn test_session_storage_round_trip() {
        let storage = SessionStorage::in_memory();
        let token = SessionToken::new("t-1").unwrap();
        storage.set_token(&token).unwrap();
        storage.set_user(&sample_profile()).unwrap();
        storage.session().set("filters", "{}").unwrap();

        assert_eq!(storage.token(), Some(token));
        assert_eq!(storage.user().unwrap().username, "maria");

        storage.clear_all().unwrap();
        assert!(storage.token().is_none());
        assert!(storage.user_raw().is_none());
        assert!(storage.session().get("filters").is_none());
    }

    #[test]
    fn test_malformed_user_reads_as_none() {
        let storage = SessionStorage::in_memory();
        storage.local().set(USER_KEY, "{\"username\":").unwrap();
        assert!(storage.user_raw().is_some());
        assert!(storage.user().is_none());
    }
}
