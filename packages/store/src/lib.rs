#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory complaint record store and the proximity query service.
//!
//! [`RecordStore`] is the single owner of complaint content, keyed by id and
//! kept in insertion order. [`service::ComplaintService`] pairs it with a
//! [`noise_map_spatial::ProximityIndex`] to answer radius queries ordered by
//! recency.

pub mod service;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use noise_map_complaint_models::ComplaintRecord;

/// Errors that can occur when writing to the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A record with this id is already stored.
    #[error("Duplicate complaint id: {id}")]
    DuplicateId {
        /// The id that was already present.
        id: String,
    },
}

#[derive(Default)]
struct Inner {
    records: Vec<Arc<ComplaintRecord>>,
    positions: HashMap<String, usize>,
}

/// Append-only store of complaint records.
///
/// Reads and writes may happen concurrently; each call takes the lock only
/// for its own duration.
#[derive(Default)]
pub struct RecordStore {
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("len", &self.len())
            .finish()
    }
}

impl RecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if a record with the same id is
    /// already present. The existing record is left untouched.
    pub fn insert(&self, record: ComplaintRecord) -> Result<Arc<ComplaintRecord>, StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner.positions.contains_key(record.id()) {
            return Err(StoreError::DuplicateId {
                id: record.id().to_string(),
            });
        }

        let position = inner.records.len();
        let record = Arc::new(record);
        inner.positions.insert(record.id().to_string(), position);
        inner.records.push(Arc::clone(&record));

        Ok(record)
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<ComplaintRecord>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .positions
            .get(id)
            .map(|&position| Arc::clone(&inner.records[position]))
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily iterates over every record in insertion order.
    ///
    /// The iterator yields the records present when it was created; records
    /// inserted afterwards are not included. Each call returns a fresh
    /// iterator.
    #[must_use]
    pub fn all(&self) -> Records<'_> {
        Records {
            store: self,
            next: 0,
            end: self.len(),
        }
    }
}

/// Iterator returned by [`RecordStore::all`].
///
/// Takes the read lock once per item, so a long walk never blocks writers
/// for more than one step.
#[derive(Debug)]
pub struct Records<'a> {
    store: &'a RecordStore,
    next: usize,
    end: usize,
}

impl Iterator for Records<'_> {
    type Item = Arc<ComplaintRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let inner = self
            .store
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let record = inner.records.get(self.next).map(Arc::clone);
        drop(inner);

        self.next += 1;
        record
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Records<'_> {}
