//! Approval step model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordRef;

/// An approver's decision at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Not decided yet.
    Pending,
    /// The level approved the record.
    Approved,
    /// The level rejected the record; it returns to `Draft`.
    Rejected,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Pending => f.write_str("pending"),
            Decision::Approved => f.write_str("approved"),
            Decision::Rejected => f.write_str("rejected"),
        }
    }
}

/// One approval level's decision on a record.
///
/// A step is opened as `Pending` when the record reaches its level and is
/// closed by `decide`. `round` increases each time a rejected record is
/// resubmitted, so earlier rounds remain in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// The record version this step decides on.
    pub record: RecordRef,
    /// Submission round (starting at 1).
    pub round: u32,
    /// The approval level.
    pub level: u8,
    /// Who decided, once decided.
    pub approver: Option<String>,
    /// The decision.
    pub decision: Decision,
    /// When the level was opened.
    pub requested_at: DateTime<Utc>,
    /// When the decision was made.
    pub decided_at: Option<DateTime<Utc>>,
    /// Free-text notes from the approver.
    pub notes: Option<String>,
}

impl ApprovalStep {
    /// Opens a pending step.
    pub fn pending(record: RecordRef, round: u32, level: u8, requested_at: DateTime<Utc>) -> Self {
        Self {
            record,
            round,
            level,
            approver: None,
            decision: Decision::Pending,
            requested_at,
            decided_at: None,
            notes: None,
        }
    }
}

/// Returns true if `steps` show every level `1..=max_level` approved, in
/// order, with no gaps, repeats or other decisions.
pub fn is_complete_approval(steps: &[ApprovalStep], max_level: u8) -> bool {
    if max_level == 0 || steps.len() != usize::from(max_level) {
        return false;
    }
    steps
        .iter()
        .zip(1..=max_level)
        .all(|(step, expected)| step.level == expected && step.decision == Decision::Approved)
}
