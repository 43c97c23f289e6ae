//! Non-blocking single-writer leases.
//!
//! Every mutating operation claims a lease on its subject for the duration
//! of read-validate-write. A claim on a subject that is already held fails
//! immediately instead of waiting, so no operation blocks indefinitely.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use crate::error::{EngineError, EngineResult};

/// A set of currently held keys.
#[derive(Debug)]
pub struct LeaseTable<K> {
    held: Mutex<HashSet<K>>,
}

impl<K> Default for LeaseTable<K> {
    fn default() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
        }
    }
}

impl<K> LeaseTable<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key`, or returns `None` if it is already held.
    pub fn try_acquire(&self, key: K) -> Option<Lease<'_, K>> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if held.insert(key.clone()) {
            Some(Lease { table: self, key })
        } else {
            None
        }
    }

    /// Returns true if `key` is currently held.
    pub fn is_held(&self, key: &K) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    fn release(&self, key: &K) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

impl<K> LeaseTable<K>
where
    K: Eq + Hash + Clone + Display,
{
    /// Claims `key`, failing with `ConcurrentModification` if it is held.
    pub fn acquire(&self, key: K) -> EngineResult<Lease<'_, K>> {
        let subject = key.to_string();
        self.try_acquire(key).ok_or_else(|| {
            tracing::debug!(subject = %subject, "Lease already held");
            EngineError::ConcurrentModification { subject }
        })
    }
}

/// A held claim; released on drop.
#[derive(Debug)]
pub struct Lease<'a, K>
where
    K: Eq + Hash + Clone,
{
    table: &'a LeaseTable<K>,
    key: K,
}

impl<K> Lease<'_, K>
where
    K: Eq + Hash + Clone,
{
    /// The claimed key.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K> Drop for Lease<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        self.table.release(&self.key);
    }
}
