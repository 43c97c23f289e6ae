//! Process-local audit log.

use std::sync::{Mutex, PoisonError};

use crate::error::EngineResult;
use crate::models::AuditEntry;

use super::AuditLog;

/// An audit log held in memory. Suitable for tests and single-process
/// deployments that ship entries elsewhere.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, entries: Vec<AuditEntry>) -> EngineResult<Vec<AuditEntry>> {
        let mut stored = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = stored.len() as u64 + 1;
        let mut appended = Vec::with_capacity(entries.len());
        for mut entry in entries {
            entry.sequence = next;
            next += 1;
            appended.push(entry);
        }
        stored.extend(appended.iter().cloned());
        Ok(appended)
    }

    fn entries(&self) -> EngineResult<Vec<AuditEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
