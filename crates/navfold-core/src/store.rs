#![forbid(unsafe_code)]

//! Best-effort persistence of the expanded/collapsed map.
//!
//! The map of node key to expanded flag is serialized as one JSON blob
//! under a single well-known slot of a key-value substrate. The
//! substrate is fallible (quota, disabled storage, corrupt data); none
//! of those faults may reach the caller. Losing UI state is acceptable,
//! breaking the navigation tree is not, so:
//!
//! - a failed or unparseable read becomes an empty state
//! - a failed write is logged and dropped
//!
//! Absence of a key means "default policy" (collapsed), never
//! "previously expanded". The state is only ever merged one key at a
//! time; the sole wholesale overwrite is corruption recovery back to
//! empty.
//!
//! # Blob Format
//!
//! ```json
//! { "#/guide": true, "#/api": false }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// The well-known storage slot holding the serialized state.
pub const STATE_SLOT: &str = "navfold:expanded";

/// Persistable expanded-state snapshot: node key to expanded flag.
///
/// Serializes transparently as the bare mapping. Keys this build does
/// not recognize are carried through untouched, so state written against
/// a future tree round-trips safely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpandedState {
    entries: HashMap<String, bool>,
}

impl ExpandedState {
    /// Empty state: every node falls back to the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded flag for `key`, if any. `None` means the default
    /// policy applies.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<bool> {
        self.entries.get(key).copied()
    }

    /// Record the flag for one key.
    pub fn set(&mut self, key: impl Into<String>, expanded: bool) {
        self.entries.insert(key.into(), expanded);
    }

    /// Number of recorded keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any key has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a key-value substrate can raise.
#[derive(Debug)]
pub enum StorageError {
    /// The substrate refused the operation (quota, disabled storage).
    Unavailable(String),
    /// I/O error from a file-backed substrate.
    Io(io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
            Self::Io(e) => write!(f, "storage I/O error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unavailable(_) => None,
            Self::Io(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Substrate contract
// ---------------------------------------------------------------------------

/// Synchronous get/set pair addressed by slot name.
///
/// This is the consumed storage contract: one serialized value per slot,
/// may fail on either side. Callers above this trait degrade gracefully
/// instead of propagating faults.
pub trait KeyValueStore {
    /// Read the raw value stored under `slot`, if any.
    fn get(&self, slot: &str) -> Result<Option<String>, StorageError>;

    /// Write the raw value stored under `slot`.
    fn set(&self, slot: &str, value: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// State store
// ---------------------------------------------------------------------------

/// The expanded-state store layered over a [`KeyValueStore`].
///
/// All operations are best-effort; see the module docs for the
/// degradation rules. Access is single-threaded, so the read-modify-write
/// in [`StateStore::record`] cannot race.
pub struct StateStore<S: KeyValueStore> {
    backend: S,
    slot: String,
}

impl<S: KeyValueStore> StateStore<S> {
    /// Create a store over `backend` using the default slot.
    pub fn new(backend: S) -> Self {
        Self::with_slot(backend, STATE_SLOT)
    }

    /// Create a store over `backend` using a custom slot name.
    pub fn with_slot(backend: S, slot: impl Into<String>) -> Self {
        Self {
            backend,
            slot: slot.into(),
        }
    }

    /// The slot this store reads and writes.
    #[must_use]
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Load the persisted state. Missing slot, substrate fault, and
    /// parse failure all yield empty state.
    #[must_use]
    pub fn load(&self) -> ExpandedState {
        let raw = match self.backend.get(&self.slot) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ExpandedState::new(),
            Err(err) => {
                tracing::warn!(
                    target: "navfold.store",
                    slot = %self.slot,
                    error = %err,
                    "expanded-state read failed; starting empty"
                );
                return ExpandedState::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(
                    target: "navfold.store",
                    slot = %self.slot,
                    error = %err,
                    "discarding corrupt expanded-state blob"
                );
                ExpandedState::new()
            }
        }
    }

    /// Persist the state. A serialization or substrate fault is logged
    /// and the write is dropped.
    pub fn save(&self, state: &ExpandedState) {
        let raw = match serde_json::to_string(state) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(
                    target: "navfold.store",
                    slot = %self.slot,
                    error = %err,
                    "expanded-state serialization failed; write dropped"
                );
                return;
            }
        };
        if let Err(err) = self.backend.set(&self.slot, &raw) {
            tracing::warn!(
                target: "navfold.store",
                slot = %self.slot,
                error = %err,
                "expanded-state write dropped"
            );
        }
    }

    /// Merge one key into the persisted state (load, mutate, save).
    pub fn record(&self, key: &str, expanded: bool) {
        let mut state = self.load();
        state.set(key, expanded);
        self.save(&state);
    }
}

// ---------------------------------------------------------------------------
// File-backed substrate
// ---------------------------------------------------------------------------

/// A [`KeyValueStore`] keeping one file per slot under a directory.
///
/// Writes use a temp-file-then-rename so a crash mid-write never leaves
/// a torn blob behind. A missing file reads as an absent slot.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created lazily
    /// on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        // Slot names may contain separators; keep them filesystem-safe.
        let name: String = slot
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, slot: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(StorageError::Io)
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(StorageError::Io)?;
        let path = self.slot_path(slot);
        let temp = temp_path(&path);
        std::fs::write(&temp, value).map_err(StorageError::Io)?;
        std::fs::rename(&temp, &path).map_err(StorageError::Io)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// In-module substrate double with switchable faults.
    #[derive(Default)]
    struct FlakyStore {
        slots: RefCell<HashMap<String, String>>,
        fail_reads: Cell<bool>,
        fail_writes: Cell<bool>,
    }

    impl KeyValueStore for &FlakyStore {
        fn get(&self, slot: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads.get() {
                return Err(StorageError::Unavailable("reads disabled".into()));
            }
            Ok(self.slots.borrow().get(slot).cloned())
        }

        fn set(&self, slot: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes.get() {
                return Err(StorageError::Unavailable("writes disabled".into()));
            }
            self.slots
                .borrow_mut()
                .insert(slot.to_owned(), value.to_owned());
            Ok(())
        }
    }

    #[test]
    fn load_missing_slot_is_empty() {
        let backend = FlakyStore::default();
        let store = StateStore::new(&backend);
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let backend = FlakyStore::default();
        let store = StateStore::new(&backend);
        let mut state = ExpandedState::new();
        state.set("#/guide", true);
        state.set("#/api", false);
        store.save(&state);
        assert_eq!(store.load(), state);
    }

    #[test]
    fn blob_is_the_bare_mapping() {
        let mut state = ExpandedState::new();
        state.set("#/guide", true);
        let raw = serde_json::to_string(&state).unwrap();
        assert_eq!(raw, r##"{"#/guide":true}"##);
    }

    #[test]
    fn corrupt_blob_resets_to_empty() {
        let backend = FlakyStore::default();
        backend
            .slots
            .borrow_mut()
            .insert(STATE_SLOT.into(), "{not json".into());
        let store = StateStore::new(&backend);
        assert!(store.load().is_empty());
    }

    #[test]
    fn read_fault_yields_empty_state() {
        let backend = FlakyStore::default();
        backend.fail_reads.set(true);
        let store = StateStore::new(&backend);
        assert!(store.load().is_empty());
    }

    #[test]
    fn write_fault_is_swallowed() {
        let backend = FlakyStore::default();
        backend.fail_writes.set(true);
        let store = StateStore::new(&backend);
        store.record("#/guide", true);
        backend.fail_writes.set(false);
        // The dropped write left nothing behind.
        assert!(store.load().is_empty());
    }

    #[test]
    fn record_merges_single_key() {
        let backend = FlakyStore::default();
        let store = StateStore::new(&backend);
        store.record("#/guide", true);
        store.record("#/api", false);
        store.record("#/guide", false);
        let state = store.load();
        assert_eq!(state.get("#/guide"), Some(false));
        assert_eq!(state.get("#/api"), Some(false));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn unrecognized_keys_survive_record() {
        let backend = FlakyStore::default();
        backend.slots.borrow_mut().insert(
            STATE_SLOT.into(),
            r##"{"#/future-section":true}"##.into(),
        );
        let store = StateStore::new(&backend);
        store.record("#/guide", true);
        let state = store.load();
        assert_eq!(state.get("#/future-section"), Some(true));
        assert_eq!(state.get("#/guide"), Some(true));
    }

    #[test]
    fn custom_slot_is_used() {
        let backend = FlakyStore::default();
        let store = StateStore::with_slot(&backend, "docs:nav");
        store.record("k", true);
        assert!(backend.slots.borrow().contains_key("docs:nav"));
        assert_eq!(store.slot(), "docs:nav");
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileStore::new(dir.path());
        let store = StateStore::new(backend);
        store.record("#/guide", true);
        assert_eq!(store.load().get("#/guide"), Some(true));
    }

    #[test]
    fn file_store_missing_file_reads_absent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileStore::new(dir.path());
        assert!(backend.get(STATE_SLOT).unwrap().is_none());
    }

    #[test]
    fn file_store_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileStore::new(dir.path());
        backend.set(STATE_SLOT, "{}").unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn file_store_sanitizes_slot_names() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileStore::new(dir.path());
        backend.set("navfold:expanded", "{}").unwrap();
        assert!(dir.path().join("navfold_expanded.json").exists());
    }

    #[test]
    fn storage_error_display() {
        let unavailable = StorageError::Unavailable("quota".into());
        assert!(unavailable.to_string().contains("quota"));
        let io_err = StorageError::Io(io::Error::other("disk"));
        assert!(io_err.to_string().contains("disk"));
    }
}
