//! Contracts of the subsystems the engine consumes.
//!
//! Attendance/leave data, the employee directory, payslip rendering and
//! notification delivery live outside this crate. Implementations are
//! supplied by the host application.

use crate::error::EngineResult;
use crate::models::{EmployeeInputs, PayPeriod, PayrollEvent, PayrollRecord};

/// Supplies attendance, leave, overtime and salary inputs.
pub trait CompensationInputProvider: Send + Sync {
    /// Returns the inputs for one employee and period.
    ///
    /// Fails with `InputUnavailable` when the upstream data cannot be
    /// produced; the calculator never waits for it.
    fn employee_inputs(&self, employee_id: &str, period: PayPeriod) -> EngineResult<EmployeeInputs>;
}

/// Lists the employees of a branch.
pub trait EmployeeDirectory: Send + Sync {
    /// Returns the ids of the branch's active employees.
    fn active_employees(&self, branch_id: &str) -> EngineResult<Vec<String>>;
}

/// Renders payslip documents on release.
pub trait PayslipRenderer: Send + Sync {
    /// Renders `record` with the given template.
    fn render(&self, record: &PayrollRecord, template_id: &str) -> EngineResult<Vec<u8>>;
}

/// Delivers notification events. Fire-and-forget.
pub trait Notifier: Send + Sync {
    /// Hands an event to the notification subsystem.
    fn notify(&self, event: PayrollEvent);
}

/// A notifier that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, event: PayrollEvent) {
        tracing::trace!(?event, "Notification dropped");
    }
}
