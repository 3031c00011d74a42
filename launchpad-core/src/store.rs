//! Authoritative in-memory registry of apps.
//!
//! [`RegistryStore`] guards a [`Registry`] with one `RwLock`. Reads clone out
//! of a read guard, so they always see whole records. Writes run under the
//! write guard through [`RegistryStore::transact`]; when a transaction
//! changed anything, a snapshot goes to the [`SnapshotSink`] before the guard
//! is released, so sinks observe snapshots in mutation order.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::RegistryError;
use crate::types::{AppName, AppRecord};

/// Receives a full copy of the registry after every mutation.
///
/// Implementations must not block for long: `persist` runs while the
/// registry write lock is held. Failures are the sink's to log.
pub trait SnapshotSink: Send + Sync {
    fn persist(&self, snapshot: Vec<AppRecord>);
}

// ---------------------------------------------------------------------------
// Registry (unsynchronized view)
// ---------------------------------------------------------------------------

/// Insertion-ordered, uniquely keyed set of records.
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<AppRecord>,
    index: HashMap<AppName, usize>,
    dirty: bool,
}

impl Registry {
    /// Build from records in registration order. Duplicate names are rejected.
    pub fn from_records(records: Vec<AppRecord>) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for record in records {
            registry.insert(record)?;
        }
        registry.dirty = false;
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&AppRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn records(&self) -> &[AppRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ports held by running records.
    pub fn running_ports(&self) -> HashSet<u16> {
        self.records
            .iter()
            .filter(|r| r.is_running())
            .filter_map(|r| r.port)
            .collect()
    }

    /// Append `record`; fails if its name is taken.
    pub fn insert(&mut self, record: AppRecord) -> Result<(), RegistryError> {
        if self.index.contains_key(record.name.as_str()) {
            return Err(RegistryError::AlreadyExists { name: record.name });
        }
        self.index.insert(record.name.clone(), self.records.len());
        self.records.push(record);
        self.dirty = true;
        Ok(())
    }

    /// Apply `mutator` to the record called `name`.
    ///
    /// The key is restored afterwards; renaming through a mutator is not
    /// supported.
    pub fn update<T>(
        &mut self,
        name: &str,
        mutator: impl FnOnce(&mut AppRecord) -> T,
    ) -> Result<T, RegistryError> {
        let Some(&i) = self.index.get(name) else {
            return Err(RegistryError::NotFound { name: name.into() });
        };
        let record = &mut self.records[i];
        let key = record.name.clone();
        let out = mutator(record);
        record.name = key;
        self.dirty = true;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// RegistryStore (synchronized)
// ---------------------------------------------------------------------------

/// Shared owner of the registry.
pub struct RegistryStore {
    inner: RwLock<Registry>,
    sink: Arc<dyn SnapshotSink>,
}

impl RegistryStore {
    /// Seed the store with persisted records.
    pub fn new(records: Vec<AppRecord>, sink: Arc<dyn SnapshotSink>) -> Result<Self, RegistryError> {
        Ok(Self {
            inner: RwLock::new(Registry::from_records(records)?),
            sink,
        })
    }

    pub fn get(&self, name: &str) -> Result<AppRecord, RegistryError> {
        let registry = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        registry
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { name: name.into() })
    }

    /// All records in registration order.
    pub fn list(&self) -> Vec<AppRecord> {
        let registry = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        registry.records().to_vec()
    }

    pub fn insert(&self, record: AppRecord) -> Result<(), RegistryError> {
        self.transact(|registry| registry.insert(record))
    }

    /// Atomically apply `mutator` to one record.
    pub fn update<T>(
        &self,
        name: &str,
        mutator: impl FnOnce(&mut AppRecord) -> T,
    ) -> Result<T, RegistryError> {
        self.transact(|registry| registry.update(name, mutator))
    }

    /// Run `f` with exclusive access to the registry.
    ///
    /// If `f` mutated anything, the sink receives a snapshot before the lock
    /// is released. A mutation is never rolled back, even if `f` later
    /// returns an error.
    pub fn transact<T, E>(&self, f: impl FnOnce(&mut Registry) -> Result<T, E>) -> Result<T, E> {
        let mut registry = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        registry.dirty = false;
        let result = f(&mut registry);
        if registry.dirty {
            registry.dirty = false;
            self.sink.persist(registry.records().to_vec());
        }
        result
    }
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RegistryStore")
            .field("apps", &registry.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
