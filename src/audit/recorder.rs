//! Builds audit entries and writes them ahead of state changes.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditEntry, SubjectType};

use super::AuditLog;

/// One state change to be audited.
#[derive(Debug, Clone)]
pub struct Transition {
    /// The kind of subject.
    pub subject_type: SubjectType,
    /// The subject identifier.
    pub subject_id: String,
    /// Previous state, `None` on creation.
    pub from_state: Option<String>,
    /// New state.
    pub to_state: String,
    /// A copy of the changed fields.
    pub payload: serde_json::Value,
}

impl Transition {
    /// A subject coming into existence in `to_state`.
    pub fn created(
        subject_type: SubjectType,
        subject_id: impl Into<String>,
        to_state: impl ToString,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            subject_type,
            subject_id: subject_id.into(),
            from_state: None,
            to_state: to_state.to_string(),
            payload,
        }
    }

    /// A subject moving from `from_state` to `to_state`.
    pub fn changed(
        subject_type: SubjectType,
        subject_id: impl Into<String>,
        from_state: impl ToString,
        to_state: impl ToString,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            subject_type,
            subject_id: subject_id.into(),
            from_state: Some(from_state.to_string()),
            to_state: to_state.to_string(),
            payload,
        }
    }
}

/// Stamps transitions with actor and time and appends them to an [`AuditLog`].
pub struct AuditTrailRecorder {
    log: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
}

impl AuditTrailRecorder {
    /// Creates a recorder writing to `log`.
    pub fn new(log: Arc<dyn AuditLog>, clock: Arc<dyn Clock>) -> Self {
        Self { log, clock }
    }

    /// Appends one transition.
    pub fn record(&self, actor: &str, transition: Transition) -> EngineResult<AuditEntry> {
        let mut entries = self.record_all(actor, vec![transition])?;
        entries.pop().ok_or_else(|| EngineError::AuditWriteFailed {
            message: "audit log returned no entry".to_string(),
        })
    }

    /// Appends several transitions as one atomic batch.
    pub fn record_all(
        &self,
        actor: &str,
        transitions: Vec<Transition>,
    ) -> EngineResult<Vec<AuditEntry>> {
        let timestamp = self.clock.now();
        let entries = transitions
            .into_iter()
            .map(|t| AuditEntry {
                sequence: 0,
                subject_type: t.subject_type,
                subject_id: t.subject_id,
                from_state: t.from_state,
                to_state: t.to_state,
                actor: actor.to_string(),
                timestamp,
                payload: t.payload,
            })
            .collect();

        self.log.append(entries).map_err(|err| {
            tracing::error!(actor = %actor, error = %err, "Audit append failed");
            match err {
                EngineError::AuditWriteFailed { .. } => err,
                other => EngineError::AuditWriteFailed {
                    message: other.to_string(),
                },
            }
        })
    }

    /// Returns the entries about one subject, in chronological order.
    pub fn query_by_subject(
        &self,
        subject_type: SubjectType,
        subject_id: &str,
    ) -> EngineResult<Vec<AuditEntry>> {
        self.log.query_by_subject(subject_type, subject_id)
    }

    /// Returns the entries caused by one actor, in chronological order.
    pub fn query_by_actor(&self, actor: &str) -> EngineResult<Vec<AuditEntry>> {
        self.log.query_by_actor(actor)
    }

    /// Returns the entries with `from <= timestamp < to`, in chronological order.
    pub fn query_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<AuditEntry>> {
        self.log.query_by_date_range(from, to)
    }
}
