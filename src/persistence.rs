//! Durable key-value persistence for history, achievements and goals.
//!
//! The engine only needs `load(key)` and `save(key, value)`. The persisted
//! document is a single JSON object holding the three collections; live
//! tracking state is never part of it, so a crash mid-run loses that run.
//!
//! Two backends are provided:
//! - [`MemoryStore`] for tests and hosts that persist elsewhere
//! - [`JsonFileStore`] writing one `<key>.json` file per key into a directory

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::{Achievement, ActivityHistory, Goals};

/// Minimal durable key-value contract.
pub trait KeyValueStore {
    /// Read the value for `key`, or `None` if it was never written.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Durably write `value` under `key`, replacing any previous value.
    fn save(&mut self, key: &str, value: &str) -> Result<()>;

    /// Move the value under `key` to a sibling location tagged with `suffix`,
    /// leaving `key` empty. Returns where it went.
    ///
    /// Used to keep an unreadable document for manual recovery while the
    /// store starts over.
    fn set_aside(&mut self, key: &str, suffix: &str) -> Result<String>;
}

/// The subset of store state that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub history: ActivityHistory,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub goals: Goals,
}

impl PersistedState {
    /// Read and decode the document under `key`.
    ///
    /// A missing key is `Ok(None)`; a present but undecodable document is an
    /// error so a corrupt file never silently wipes history.
    pub fn load_from<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Result<Option<Self>> {
        match store.load(key)? {
            Some(json) => {
                let state: Self = serde_json::from_str(&json)?;
                info!(
                    "[Persistence] Loaded '{}': {} activities, {} achievements",
                    key,
                    state.history.len(),
                    state.achievements.len()
                );
                Ok(Some(state))
            }
            None => {
                info!("[Persistence] Nothing stored under '{}'", key);
                Ok(None)
            }
        }
    }

    /// Encode and write the document under `key`.
    pub fn save_to<S: KeyValueStore + ?Sized>(&self, store: &mut S, key: &str) -> Result<()> {
        PersistedView {
            history: &self.history,
            achievements: &self.achievements,
            goals: &self.goals,
        }
        .save_to(store, key)
    }
}

/// Borrowed form of [`PersistedState`], so the store can flush without
/// cloning its history.
#[derive(Debug, Serialize)]
pub(crate) struct PersistedView<'a> {
    pub history: &'a ActivityHistory,
    pub achievements: &'a [Achievement],
    pub goals: &'a Goals,
}

impl PersistedView<'_> {
    pub fn save_to<S: KeyValueStore + ?Sized>(&self, store: &mut S, key: &str) -> Result<()> {
        let json = serde_json::to_string(self)?;
        store.save(key, &json)?;
        debug!("[Persistence] Saved '{}' ({} bytes)", key, json.len());
        Ok(())
    }
}

// ============================================================================
// Backends
// ============================================================================

/// In-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value, for inspection.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_aside(&mut self, key: &str, suffix: &str) -> Result<String> {
        let aside = format!("{key}.corrupt-{suffix}");
        if let Some(value) = self.entries.remove(key) {
            self.entries.insert(aside.clone(), value);
        }
        Ok(aside)
    }
}

/// Directory-backed JSON files, one per key.
///
/// Writes go to a temporary sibling file that is synced to disk before it is
/// renamed over the target, and the directory is synced after the rename.
/// A crash or power loss mid-write leaves either the previous document or the
/// new one, never a truncated file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

// Directory handles cannot be synced on Windows; rename is already durable there.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn storage_error(key: &str, source: std::io::Error) -> TrackerError {
    TrackerError::Storage {
        key: key.to_string(),
        source,
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(key, e)),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| storage_error(key, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{key}.json."))
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| storage_error(key, e))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| storage_error(key, e))?;
        tmp.as_file().sync_all().map_err(|e| storage_error(key, e))?;
        tmp.persist(self.path_for(key))
            .map_err(|e| storage_error(key, e.error))?;
        sync_dir(&self.dir).map_err(|e| storage_error(key, e))?;
        Ok(())
    }

    fn set_aside(&mut self, key: &str, suffix: &str) -> Result<String> {
        let aside = self.dir.join(format!("{key}.json.corrupt-{suffix}"));
        match fs::rename(self.path_for(key), &aside) {
            Ok(()) => sync_dir(&self.dir).map_err(|e| storage_error(key, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(storage_error(key, e)),
        }
        Ok(aside.display().to_string())
    }
}
