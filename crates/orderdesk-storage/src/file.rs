//! File-backed local store
//!
//! Keeps a copy of the map in memory for reads. Every write takes an
//! advisory lock on `<file>.lock`, re-reads the file, changes the one key
//! and rewrites it (temp file + rename), so handles in other processes do
//! not revert each other's keys. [`FileLocalStore::reload`] picks up changes
//! other processes made to the same file and announces them to listeners,
//! the same way a browser delivers storage events from other tabs.

use crate::error::StorageError;
use crate::local::{notify, ChangeListener, LocalStore, StorageChange};
use crate::subscription::{ListenerSet, Subscription};
use fs2::FileExt;
use parking_lot::{ReentrantMutex, RwLock};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Local store persisted to a JSON file
#[derive(Debug)]
pub struct FileLocalStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
    listeners: ListenerSet<ChangeListener>,
    /// Held across a write and its notification
    dispatch: ReentrantMutex<()>,
}

impl FileLocalStore {
    /// Open a store file, starting empty when it does not exist yet
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = read_entries(&path)?;
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened local store");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            listeners: ListenerSet::new(),
            dispatch: ReentrantMutex::new(()),
        })
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and announce every key that differs from memory
    ///
    /// Returns the number of changes delivered.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn reload(&self) -> Result<usize, StorageError> {
        let _dispatch = self.dispatch.lock();
        let on_disk = read_entries(&self.path)?;

        let changes: Vec<StorageChange> = {
            let mut entries = self.entries.write();
            let changes = diff(&entries, &on_disk);
            *entries = on_disk;
            changes
        };

        for change in &changes {
            notify(&self.listeners, change);
        }
        if !changes.is_empty() {
            tracing::debug!(changes = changes.len(), "reloaded local store from disk");
        }
        Ok(changes.len())
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Exclusive lock shared by every process writing this file
    ///
    /// Released when the returned file is dropped.
    fn lock_file(&self) -> Result<fs::File, StorageError> {
        let mut name = self.path.clone().into_os_string();
        name.push(".lock");
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(PathBuf::from(name))
            .map_err(|e| self.io_error(e))?;
        file.lock_exclusive().map_err(|e| self.io_error(e))?;
        Ok(file)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp).map_err(|e| self.io_error(e))?;
            file.write_all(&json).map_err(|e| self.io_error(e))?;
            file.sync_all().map_err(|e| self.io_error(e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    /// Write one key through to the file
    ///
    /// Other keys are taken from the file as it is now, not from memory; the
    /// memory copy of them is left for [`FileLocalStore::reload`] to bring
    /// up to date. Must be called with `dispatch` held.
    fn mutate(
        &self,
        key: &str,
        new_value: Option<&str>,
    ) -> Result<Option<StorageChange>, StorageError> {
        let old_value = self.entries.read().get(key).cloned();

        let _lock = self.lock_file()?;
        let mut on_disk = read_entries(&self.path)?;
        if on_disk.get(key).map(String::as_str) != new_value {
            match new_value {
                Some(value) => on_disk.insert(key.to_string(), value.to_string()),
                None => on_disk.remove(key),
            };
            self.persist(&on_disk)?;
        }

        {
            let mut entries = self.entries.write();
            match new_value {
                Some(value) => entries.insert(key.to_string(), value.to_string()),
                None => entries.remove(key),
            };
        }

        if old_value.as_deref() == new_value {
            return Ok(None);
        }
        Ok(Some(StorageChange {
            key: key.to_string(),
            old_value,
            new_value: new_value.map(str::to_string),
        }))
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _dispatch = self.dispatch.lock();
        if let Some(change) = self.mutate(key, Some(value))? {
            notify(&self.listeners, &change);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _dispatch = self.dispatch.lock();
        if let Some(change) = self.mutate(key, None)? {
            notify(&self.listeners, &change);
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.listeners.insert(listener)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }

    serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn diff(
    current: &BTreeMap<String, String>,
    incoming: &BTreeMap<String, String>,
) -> Vec<StorageChange> {
    let mut changes = Vec::new();

    for (key, value) in incoming {
        let old_value = current.get(key);
        if old_value != Some(value) {
            changes.push(StorageChange {
                key: key.clone(),
                old_value: old_value.cloned(),
                new_value: Some(value.clone()),
            });
        }
    }

    for (key, value) in current {
        if !incoming.contains_key(key) {
            changes.push(StorageChange {
                key: key.clone(),
                old_value: Some(value.clone()),
                new_value: None,
            });
        }
    }

    changes
}
