//! # Defaults
//!
//! A user-preferences layer: a TOML key-value file plus
//! [`PreferenceRelay`], which mirrors one entry into an in-memory
//! observable value.
//!
//! The file lives at `~/.rudder/defaults.toml` by default. Every mutation
//! rewrites the whole file atomically (`.tmp` + rename); it is a
//! preferences store, not a database.

mod relay;

pub use relay::{PreferenceRelay, bind, bind_results};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::{info, warn};
use toml::Value;
use toml::value::Table;

/// A persistent key-value store of TOML values.
pub struct DefaultsStore {
    path: PathBuf,
    entries: Mutex<Table>,
}

impl DefaultsStore {
    /// Open (or start) the store at `path`. A malformed file is logged
    /// and treated as empty rather than failing; preferences degrade,
    /// they don't abort startup.
    pub fn open(path: impl Into<PathBuf>) -> DefaultsStore {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Table>(&contents) {
                Ok(table) => {
                    info!("loaded defaults from {}", path.display());
                    table
                }
                Err(e) => {
                    warn!("malformed defaults file {}: {e}", path.display());
                    Table::new()
                }
            },
            Err(_) => Table::new(),
        };
        DefaultsStore {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// The default store at `~/.rudder/defaults.toml`.
    pub fn standard() -> Option<DefaultsStore> {
        dirs::home_dir().map(|home| Self::open(home.join(".rudder").join("defaults.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored value for a key, if any.
    pub fn data(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Store a value under a key and persist.
    pub fn set(&self, key: &str, value: Value) {
        let mut entries = self.lock();
        entries.insert(key.to_string(), value);
        self.persist(&entries);
    }

    /// Remove a key and persist.
    pub fn remove(&self, key: &str) {
        let mut entries = self.lock();
        entries.remove(key);
        self.persist(&entries);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Table> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist errors are logged, not surfaced: the in-memory table is
    /// still the source of truth for this process.
    fn persist(&self, entries: &Table) {
        let rendered = match toml::to_string_pretty(entries) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!("could not render defaults: {e}");
                return;
            }
        };
        if let Some(parent) = self.path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warn!("could not create defaults directory: {e}");
            return;
        }
        let tmp_path = self.path.with_extension("tmp");
        let written = fs::write(&tmp_path, rendered).and_then(|_| fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            warn!("could not persist defaults to {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scratch() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("defaults.toml");
        (dir, path)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, path) = scratch();
        let store = DefaultsStore::open(&path);
        assert!(store.data("anything").is_none());
    }

    #[test]
    fn test_set_persists_across_reopen() {
        let (_dir, path) = scratch();
        let store = DefaultsStore::open(&path);
        store.set("greeting", Value::String("hello".to_string()));

        let reopened = DefaultsStore::open(&path);
        assert_eq!(
            reopened.data("greeting"),
            Some(Value::String("hello".to_string()))
        );
    }

    #[test]
    fn test_remove_deletes_the_entry() {
        let (_dir, path) = scratch();
        let store = DefaultsStore::open(&path);
        store.set("ephemeral", Value::Integer(7));
        store.remove("ephemeral");

        assert!(store.data("ephemeral").is_none());
        let reopened = DefaultsStore::open(&path);
        assert!(reopened.data("ephemeral").is_none());
    }

    #[test]
    fn test_malformed_file_treated_as_empty() {
        let (_dir, path) = scratch();
        fs::write(&path, "this is not [valid toml").unwrap();
        let store = DefaultsStore::open(&path);
        assert!(store.data("anything").is_none());
    }
}
