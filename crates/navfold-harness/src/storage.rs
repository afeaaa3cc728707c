#![forbid(unsafe_code)]

//! In-memory key-value substrate with fault injection.

use navfold_core::store::{KeyValueStore, StorageError};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

struct StoreInner {
    slots: RefCell<HashMap<String, String>>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    reads: Cell<usize>,
    writes: Cell<usize>,
}

/// A [`KeyValueStore`] backed by a map, with switchable faults.
///
/// Clones share storage, so a test can hold one handle while the state
/// store owns another.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Rc<StoreInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty, healthy store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                slots: RefCell::new(HashMap::new()),
                fail_reads: Cell::new(false),
                fail_writes: Cell::new(false),
                reads: Cell::new(0),
                writes: Cell::new(0),
            }),
        }
    }

    /// Pre-populate a slot.
    pub fn seed(&self, slot: &str, value: &str) {
        self.inner
            .slots
            .borrow_mut()
            .insert(slot.to_owned(), value.to_owned());
    }

    /// The raw value currently stored under `slot`.
    #[must_use]
    pub fn raw(&self, slot: &str) -> Option<String> {
        self.inner.slots.borrow().get(slot).cloned()
    }

    /// Make every read fail (simulates disabled storage).
    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.set(fail);
    }

    /// Make every write fail (simulates quota exhaustion).
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.set(fail);
    }

    /// Reads attempted so far, including failed ones.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.inner.reads.get()
    }

    /// Writes attempted so far, including failed ones.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.inner.writes.get()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, slot: &str) -> Result<Option<String>, StorageError> {
        self.inner.reads.set(self.inner.reads.get() + 1);
        if self.inner.fail_reads.get() {
            return Err(StorageError::Unavailable("reads disabled".into()));
        }
        Ok(self.inner.slots.borrow().get(slot).cloned())
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        self.inner.writes.set(self.inner.writes.get() + 1);
        if self.inner.fail_writes.get() {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        self.inner
            .slots
            .borrow_mut()
            .insert(slot.to_owned(), value.to_owned());
        Ok(())
    }
}
