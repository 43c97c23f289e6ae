//! Payslip release.

use tracing::{info, warn};

use crate::audit::Transition;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Actor, ApprovalStep, PayrollEvent, PayrollRecord, RecordRef, RecordStatus, SubjectType,
    is_complete_approval,
};

use super::{PayslipApprovalWorkflow, current_head};

/// The result of releasing one record.
#[derive(Debug)]
pub struct ReleaseOutcome {
    /// The record the release was requested for.
    pub record: RecordRef,
    /// The released record, or why it was not released.
    pub result: EngineResult<PayrollRecord>,
}

impl PayslipApprovalWorkflow {
    /// Releases approved records, rendering each payslip.
    ///
    /// Records are released independently; one failure does not prevent
    /// the others. A record whose payslip cannot be rendered stays
    /// `Approved`.
    pub fn release(&self, records: &[RecordRef], released_by: &Actor) -> Vec<ReleaseOutcome> {
        records
            .iter()
            .map(|reference| {
                let result = self.release_one(*reference, released_by);
                if let Err(err) = &result {
                    warn!(record = %reference, error = %err, "Release failed");
                }
                ReleaseOutcome {
                    record: *reference,
                    result,
                }
            })
            .collect()
    }

    fn release_one(
        &self,
        reference: RecordRef,
        released_by: &Actor,
    ) -> EngineResult<PayrollRecord> {
        let chain = self.state.config().approval_chain();
        if let Some(role) = chain.release_role.as_deref() {
            if !released_by.has_role(role) {
                return Err(EngineError::Unauthorized {
                    actor: released_by.id.clone(),
                    required_role: role.to_string(),
                });
            }
        }

        let key = self.state.store().record(&reference)?.key();
        let _lease = self.state.record_leases().acquire(key)?;

        let mut record = self.state.store().read(|data| -> EngineResult<PayrollRecord> {
            let record = current_head(data, &reference)?;
            if record.status != RecordStatus::Approved {
                return Err(EngineError::InvalidState {
                    subject: reference.to_string(),
                    expected: RecordStatus::Approved.to_string(),
                    actual: record.status.to_string(),
                });
            }
            let round = current_round(data.steps(&reference));
            if !is_complete_approval(&round, chain.max_level()) {
                return Err(EngineError::InvalidState {
                    subject: reference.to_string(),
                    expected: format!("approval at levels 1..={}", chain.max_level()),
                    actual: format!("{} approval step(s)", round.len()),
                });
            }
            Ok(record.clone())
        })?;

        let template = &self.state.config().settings().payslip_template;
        let document = self.renderer.render(&record, template)?;

        let now = self.state.clock().now();
        record.status = RecordStatus::Released;
        record.released_at = Some(now);
        record.released_by = Some(released_by.id.clone());

        self.state.audit().record(
            &released_by.id,
            Transition::changed(
                SubjectType::PayrollRecord,
                reference.to_string(),
                RecordStatus::Approved,
                RecordStatus::Released,
                serde_json::json!({
                    "template": template,
                    "document_bytes": document.len(),
                    "net": record.net.to_string(),
                }),
            ),
        )?;

        let stored = record.clone();
        self.state.store().write(|data| data.replace(stored))?;

        info!(
            record = %reference,
            employee_id = %record.employee_id,
            period = %record.period,
            released_by = %released_by.id,
            "Payslip released"
        );

        self.state.notifier().notify(PayrollEvent::PayslipReleased {
            record: reference,
            employee_id: record.employee_id.clone(),
            period: record.period,
            document_bytes: document.len(),
        });

        Ok(record)
    }
}

/// Returns the steps of the latest approval round, in order.
fn current_round(steps: &[ApprovalStep]) -> Vec<ApprovalStep> {
    let Some(latest) = steps.iter().map(|s| s.round).max() else {
        return Vec::new();
    };
    steps.iter().filter(|s| s.round == latest).cloned().collect()
}
