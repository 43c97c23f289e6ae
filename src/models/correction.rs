//! Error correction model.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ComponentSide, RecordRef};

/// Identifier of an error correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrectionId(pub Uuid);

impl CorrectionId {
    /// Generates a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The change a correction makes to the original record's components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CorrectionType {
    /// Adds `delta` (possibly negative) to an existing component.
    AmountAdjustment {
        /// The component name.
        component: String,
        /// The list the component lives in.
        side: ComponentSide,
        /// The signed change.
        delta: Decimal,
    },
    /// Adds a new component.
    AddComponent {
        /// The component name; must not exist yet.
        component: String,
        /// The list to add to.
        side: ComponentSide,
        /// The amount.
        amount: Decimal,
    },
    /// Removes an existing component.
    RemoveComponent {
        /// The component name.
        component: String,
        /// The list to remove from.
        side: ComponentSide,
    },
}

/// Lifecycle state of an error correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionStatus {
    /// Awaiting an approver.
    Requested,
    /// Approved; awaiting processing.
    Approved,
    /// Refused. Terminal.
    Rejected,
    /// Applied as a new record version. Terminal and immutable.
    Processed,
    /// Withdrawn before processing. Terminal.
    Cancelled,
}

impl fmt::Display for CorrectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectionStatus::Requested => f.write_str("requested"),
            CorrectionStatus::Approved => f.write_str("approved"),
            CorrectionStatus::Rejected => f.write_str("rejected"),
            CorrectionStatus::Processed => f.write_str("processed"),
            CorrectionStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A requested adjustment to a released payroll record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCorrection {
    /// The correction identifier.
    pub id: CorrectionId,
    /// The record version being corrected.
    pub original: RecordRef,
    /// The change to apply.
    pub correction_type: CorrectionType,
    /// Why the correction is needed.
    pub description: String,
    /// Who asked for it.
    pub requested_by: String,
    /// When it was asked for.
    pub requested_at: DateTime<Utc>,
    /// Lifecycle state.
    pub status: CorrectionStatus,
    /// Who approved or rejected it.
    pub approver: Option<String>,
    /// When it was approved or rejected.
    pub decided_at: Option<DateTime<Utc>>,
    /// Approver notes.
    pub decision_notes: Option<String>,
    /// Who processed it.
    pub processed_by: Option<String>,
    /// When it was processed.
    pub processed_at: Option<DateTime<Utc>>,
    /// The version produced by processing.
    pub produced: Option<RecordRef>,
    /// Who cancelled it.
    pub cancelled_by: Option<String>,
    /// Why it was cancelled.
    pub cancellation_reason: Option<String>,
}

impl ErrorCorrection {
    /// Creates a correction in the `Requested` state.
    pub fn requested(
        original: RecordRef,
        correction_type: CorrectionType,
        description: impl Into<String>,
        requested_by: impl Into<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CorrectionId::new(),
            original,
            correction_type,
            description: description.into(),
            requested_by: requested_by.into(),
            requested_at,
            status: CorrectionStatus::Requested,
            approver: None,
            decided_at: None,
            decision_notes: None,
            processed_by: None,
            processed_at: None,
            produced: None,
            cancelled_by: None,
            cancellation_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_correction_type_serialization() {
        let correction = CorrectionType::AddComponent {
            component: "Shift allowance".to_string(),
            side: ComponentSide::Earning,
            amount: Decimal::from_str("200.00").unwrap(),
        };
        let json = serde_json::to_string(&correction).unwrap();
        assert!(json.contains("\"type\":\"add_component\""));
        assert!(json.contains("\"side\":\"earning\""));
        assert!(json.contains("\"amount\":\"200.00\""));
    }

    #[test]
    fn test_correction_type_deserialization() {
        let json = r#"{"type":"remove_component","component":"Union fee","side":"deduction"}"#;
        let correction: CorrectionType = serde_json::from_str(json).unwrap();
        assert_eq!(
            correction,
            CorrectionType::RemoveComponent {
                component: "Union fee".to_string(),
                side: ComponentSide::Deduction,
            }
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(CorrectionStatus::Processed.to_string(), "processed");
        assert_eq!(CorrectionStatus::Cancelled.to_string(), "cancelled");
    }
}
