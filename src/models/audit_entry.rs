//! Audit entry model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of entity an audit entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    /// A payroll record version (subject id `"<record id>@v<version>"`).
    PayrollRecord,
    /// An error correction (subject id is the correction id).
    ErrorCorrection,
    /// A branch processing run (subject id is the run id).
    BranchRun,
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectType::PayrollRecord => f.write_str("payroll_record"),
            SubjectType::ErrorCorrection => f.write_str("error_correction"),
            SubjectType::BranchRun => f.write_str("branch_run"),
        }
    }
}

/// An immutable record of one state change.
///
/// Creation of a subject is logged with `from_state = None`; every later
/// transition carries both states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, assigned by the log on append (starting at 1).
    pub sequence: u64,
    /// The kind of subject.
    pub subject_type: SubjectType,
    /// The subject identifier.
    pub subject_id: String,
    /// The state before the change, if the subject existed.
    pub from_state: Option<String>,
    /// The state after the change.
    pub to_state: String,
    /// Who caused the change.
    pub actor: String,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
    /// A copy of the fields that changed.
    pub payload: serde_json::Value,
}

impl AuditEntry {
    /// Returns true for transitions between two states (as opposed to creation).
    pub fn is_transition(&self) -> bool {
        self.from_state.is_some()
    }
}
