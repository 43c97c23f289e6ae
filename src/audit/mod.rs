//! Append-only audit trail.
//!
//! Every state change of a payroll record, error correction or branch run
//! is written here before the change itself is committed. If the write
//! fails, the triggering operation fails and nothing is committed.

mod jsonl;
mod memory;
mod recorder;

use chrono::{DateTime, Utc};

use crate::error::EngineResult;
use crate::models::{AuditEntry, SubjectType};

pub use jsonl::JsonlAuditLog;
pub use memory::MemoryAuditLog;
pub use recorder::{AuditTrailRecorder, Transition};

/// Durable storage for audit entries.
///
/// `append` must not return `Ok` until every entry in the batch is durably
/// stored; a batch is stored entirely or not at all. The log assigns
/// sequence numbers.
pub trait AuditLog: Send + Sync {
    /// Appends a batch of entries, returning them with sequence numbers.
    fn append(&self, entries: Vec<AuditEntry>) -> EngineResult<Vec<AuditEntry>>;

    /// Returns every entry in append order.
    fn entries(&self) -> EngineResult<Vec<AuditEntry>>;

    /// Returns the entries about one subject, in chronological order.
    fn query_by_subject(
        &self,
        subject_type: SubjectType,
        subject_id: &str,
    ) -> EngineResult<Vec<AuditEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.subject_type == subject_type && e.subject_id == subject_id)
            .collect())
    }

    /// Returns the entries caused by one actor, in chronological order.
    fn query_by_actor(&self, actor: &str) -> EngineResult<Vec<AuditEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.actor == actor)
            .collect())
    }

    /// Returns the entries with `from <= timestamp < to`, in chronological order.
    fn query_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<AuditEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.timestamp >= from && e.timestamp < to)
            .collect())
    }
}
