//! Persistent application state: the signed in user and bookmarks.
//!
//! State is kept in a [`KeyValueStore`] under fixed keys, so the same
//! records can live in memory, in a file, or in any other store.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::Result;

const AUTH_KEY: &str = "echoTour_auth";
const USER_KEY: &str = "echoTour_user";
const BOOKMARKS_KEY: &str = "echoTour_bookmarks";

/// String key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object in a file.
///
/// The file is read once when opened and rewritten on every change. It is
/// created on the first write.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FileStore {
    /// Opens the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `DataLoss` when the file exists but is not a JSON object of
    /// strings, or an I/O error when it cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no state file at {}, starting fresh", path.display());
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, entries })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, contents)?;
        trace!("wrote state to {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_owned(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

/// Sign-in state and bookmarks on top of a [`KeyValueStore`].
#[derive(Debug)]
pub struct AppState<S> {
    store: S,
}

impl<S: KeyValueStore> AppState<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a user is signed in.
    ///
    /// A stored user that cannot be read counts as signed out.
    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.user()?.is_some())
    }

    /// The signed in user, if any.
    pub fn user(&self) -> Result<Option<User>> {
        if self.store.get(AUTH_KEY)?.as_deref() != Some("true") {
            return Ok(None);
        }

        let Some(record) = self.store.get(USER_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str(&record) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!("ignoring corrupt user record: {e}");
                Ok(None)
            }
        }
    }

    pub fn sign_in(&mut self, user: &User) -> Result<()> {
        let record = serde_json::to_string(user)?;
        self.store.set(USER_KEY, record)?;
        self.store.set(AUTH_KEY, "true".to_owned())?;
        info!("signed in as {}", user.name);
        Ok(())
    }

    pub fn sign_out(&mut self) -> Result<()> {
        self.store.remove(AUTH_KEY)?;
        self.store.remove(USER_KEY)?;
        info!("signed out");
        Ok(())
    }

    /// Bookmarked story identifiers, in the order they were added.
    pub fn bookmarks(&self) -> Result<Vec<String>> {
        let Some(record) = self.store.get(BOOKMARKS_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&record) {
            Ok(bookmarks) => Ok(bookmarks),
            Err(e) => {
                warn!("ignoring corrupt bookmarks: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Adds or removes a bookmark. Returns whether `id` is now bookmarked.
    pub fn toggle_bookmark(&mut self, id: &str) -> Result<bool> {
        let mut bookmarks = self.bookmarks()?;
        let bookmarked = if let Some(index) = bookmarks.iter().position(|b| b == id) {
            bookmarks.remove(index);
            false
        } else {
            bookmarks.push(id.to_owned());
            true
        };

        self.store
            .set(BOOKMARKS_KEY, serde_json::to_string(&bookmarks)?)?;
        Ok(bookmarked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn user() -> User {
        User {
            name: "Demo User".to_owned(),
            email: "demo@echotour.com".to_owned(),
        }
    }

    #[test]
    fn sign_in_and_out() {
        let mut state = AppState::new(MemoryStore::default());
        assert!(!state.is_authenticated().unwrap());

        state.sign_in(&user()).unwrap();
        assert!(state.is_authenticated().unwrap());
        assert_eq!(state.user().unwrap(), Some(user()));

        state.sign_out().unwrap();
        assert!(!state.is_authenticated().unwrap());
        assert_eq!(state.store().get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_user_counts_as_signed_out() {
        let mut store = MemoryStore::default();
        store.set(AUTH_KEY, "true".to_owned()).unwrap();
        store.set(USER_KEY, "{not json".to_owned()).unwrap();

        let state = AppState::new(store);
        assert!(!state.is_authenticated().unwrap());
    }

    #[test]
    fn user_without_auth_flag_is_signed_out() {
        let mut store = MemoryStore::default();
        store
            .set(USER_KEY, serde_json::to_string(&user()).unwrap())
            .unwrap();
        assert_eq!(AppState::new(store).user().unwrap(), None);
    }

    #[test]
    fn bookmarks_toggle() {
        let mut state = AppState::new(MemoryStore::default());
        assert!(state.toggle_bookmark("taj-mahal").unwrap());
        assert!(state.toggle_bookmark("petra").unwrap());
        assert_eq!(state.bookmarks().unwrap(), vec!["taj-mahal", "petra"]);

        assert!(!state.toggle_bookmark("taj-mahal").unwrap());
        assert_eq!(state.bookmarks().unwrap(), vec!["petra"]);
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = AppState::new(FileStore::open(&path).unwrap());
        state.sign_in(&user()).unwrap();
        state.toggle_bookmark("kyoto").unwrap();

        let state = AppState::new(FileStore::open(&path).unwrap());
        assert_eq!(state.user().unwrap(), Some(user()));
        assert_eq!(state.bookmarks().unwrap(), vec!["kyoto"]);
    }

    #[test]
    fn corrupt_file_is_data_loss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2").unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DataLoss);
    }
}
