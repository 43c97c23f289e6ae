//! Notification events emitted on payroll state changes.

use serde::{Deserialize, Serialize};

use super::{CorrectionId, Decision, PayPeriod, RecordRef};

/// An event handed to the notification subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PayrollEvent {
    /// A record was (re)calculated.
    RecordCalculated {
        /// The record version.
        record: RecordRef,
        /// The employee paid.
        employee_id: String,
    },
    /// A record entered (or advanced to) an approval level.
    ApprovalRequested {
        /// The record version.
        record: RecordRef,
        /// The level now pending.
        level: u8,
    },
    /// A level decided on a record.
    ApprovalDecided {
        /// The record version.
        record: RecordRef,
        /// The level that decided.
        level: u8,
        /// The decision.
        decision: Decision,
    },
    /// A payslip became visible to the employee.
    PayslipReleased {
        /// The record version.
        record: RecordRef,
        /// The employee paid.
        employee_id: String,
        /// The pay period.
        period: PayPeriod,
        /// Size of the rendered payslip document.
        document_bytes: usize,
    },
    /// A correction changed state.
    CorrectionUpdated {
        /// The correction.
        correction: CorrectionId,
        /// Its new status.
        status: String,
    },
    /// A correction produced a new released version.
    RecordCorrected {
        /// The superseded version.
        original: RecordRef,
        /// The new head version.
        corrected: RecordRef,
    },
}
