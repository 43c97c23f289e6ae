//! Multi-level payslip approval and release.
//!
//! The approval chain is a table of `(level, role)` pairs loaded from
//! configuration. Submitting a calculated record opens a new approval round
//! at level 1; each approval advances one level, a rejection returns the
//! record to `Draft`. Only records whose current round carries an approval
//! for every level, in order, can be released.

mod release;
mod sla;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::audit::Transition;
use crate::collaborators::PayslipRenderer;
use crate::error::{EngineError, EngineResult};
use crate::lease::Lease;
use crate::models::{
    Actor, ApprovalStep, Decision, PayrollEvent, PayrollKey, PayrollRecord, RecordRef,
    RecordStatus, SubjectType,
};
use crate::state::EngineState;
use crate::store::StoreData;

pub use release::ReleaseOutcome;
pub use sla::OverdueApproval;

/// Drives payroll records through approval and release.
#[derive(Clone)]
pub struct PayslipApprovalWorkflow {
    state: EngineState,
    renderer: Arc<dyn PayslipRenderer>,
}

impl PayslipApprovalWorkflow {
    /// Creates a workflow rendering payslips with `renderer` on release.
    pub fn new(state: EngineState, renderer: Arc<dyn PayslipRenderer>) -> Self {
        Self { state, renderer }
    }

    /// Submits calculated records for approval.
    ///
    /// Every record must be the head of its chain and `Calculated`. The
    /// operation is all-or-nothing: if any record fails validation, none is
    /// submitted.
    pub fn submit_for_approval(
        &self,
        records: &[RecordRef],
        actor: &Actor,
    ) -> EngineResult<Vec<PayrollRecord>> {
        let mut seen = HashSet::new();
        if let Some(duplicate) = records.iter().find(|r| !seen.insert(**r)) {
            return Err(EngineError::InvalidInput {
                field: "records".to_string(),
                message: format!("{} listed more than once", duplicate),
            });
        }

        let keys = self.state.store().read(|data| {
            records
                .iter()
                .map(|r| data.require_record(r).map(PayrollRecord::key))
                .collect::<EngineResult<Vec<_>>>()
        })?;
        let _leases = keys
            .into_iter()
            .map(|key| self.state.record_leases().acquire(key))
            .collect::<EngineResult<Vec<Lease<'_, PayrollKey>>>>()?;

        let now = self.state.clock().now();
        let mut submitted = Vec::with_capacity(records.len());
        let mut steps = Vec::with_capacity(records.len());
        self.state.store().read(|data| -> EngineResult<()> {
            for reference in records {
                let record = current_head(data, reference)?;
                if record.status != RecordStatus::Calculated {
                    return Err(EngineError::InvalidState {
                        subject: reference.to_string(),
                        expected: RecordStatus::Calculated.to_string(),
                        actual: record.status.to_string(),
                    });
                }
                let round = data.steps(reference).iter().map(|s| s.round).max().unwrap_or(0) + 1;
                let mut record = record.clone();
                record.status = RecordStatus::PendingApproval { level: 1 };
                steps.push(ApprovalStep::pending(*reference, round, 1, now));
                submitted.push(record);
            }
            Ok(())
        })?;

        let transitions = submitted
            .iter()
            .zip(&steps)
            .map(|(record, step)| {
                Transition::changed(
                    SubjectType::PayrollRecord,
                    record.reference().to_string(),
                    RecordStatus::Calculated,
                    record.status,
                    serde_json::json!({ "round": step.round, "level": step.level }),
                )
            })
            .collect();
        self.state.audit().record_all(&actor.id, transitions)?;

        self.state.store().write(|data| -> EngineResult<()> {
            for (record, step) in submitted.iter().zip(steps) {
                data.replace(record.clone())?;
                data.steps_mut(&step.record).push(step);
            }
            Ok(())
        })?;

        info!(actor = %actor.id, count = submitted.len(), "Records submitted for approval");
        for record in &submitted {
            self.state.notifier().notify(PayrollEvent::ApprovalRequested {
                record: record.reference(),
                level: 1,
            });
        }

        Ok(submitted)
    }

    /// Records an approval decision at `level`.
    ///
    /// The approver must hold the role configured for the level, the record
    /// must be waiting at exactly that level, and `decision` must be
    /// `Approved` or `Rejected`. Approval advances to the next level, or to
    /// `Approved` after the last one; rejection returns the record to
    /// `Draft`.
    pub fn decide(
        &self,
        reference: RecordRef,
        level: u8,
        approver: &Actor,
        decision: Decision,
        notes: Option<String>,
    ) -> EngineResult<PayrollRecord> {
        if decision == Decision::Pending {
            return Err(EngineError::InvalidInput {
                field: "decision".to_string(),
                message: "must be approved or rejected".to_string(),
            });
        }

        let chain = self.state.config().approval_chain();
        let role = chain
            .role_for(level)
            .ok_or_else(|| EngineError::InvalidInput {
                field: "level".to_string(),
                message: format!("approval chain has no level {}", level),
            })?;
        if !approver.has_role(role) {
            return Err(EngineError::Unauthorized {
                actor: approver.id.clone(),
                required_role: role.to_string(),
            });
        }

        let key = self.state.store().record(&reference)?.key();
        let _lease = self.state.record_leases().acquire(key)?;

        let (mut record, mut step) = self.state.store().read(|data| -> EngineResult<_> {
            let record = current_head(data, &reference)?;
            let pending = match record.status {
                RecordStatus::PendingApproval { level } => level,
                status => {
                    return Err(EngineError::InvalidState {
                        subject: reference.to_string(),
                        expected: "pending_approval".to_string(),
                        actual: status.to_string(),
                    });
                }
            };
            if pending != level {
                return Err(EngineError::LevelMismatch {
                    record: reference.to_string(),
                    pending,
                    requested: level,
                });
            }
            let step = data
                .steps(&reference)
                .iter()
                .rev()
                .find(|s| s.level == level && s.decision == Decision::Pending)
                .cloned()
                .ok_or_else(|| EngineError::InvalidState {
                    subject: reference.to_string(),
                    expected: format!("an open step at level {}", level),
                    actual: "none".to_string(),
                })?;
            Ok((record.clone(), step))
        })?;

        let now = self.state.clock().now();
        step.approver = Some(approver.id.clone());
        step.decision = decision;
        step.decided_at = Some(now);
        step.notes = notes;

        let from_status = record.status;
        let next_step = match decision {
            Decision::Approved if level < chain.max_level() => {
                record.status = RecordStatus::PendingApproval { level: level + 1 };
                Some(ApprovalStep::pending(reference, step.round, level + 1, now))
            }
            Decision::Approved => {
                record.status = RecordStatus::Approved;
                None
            }
            _ => {
                record.status = RecordStatus::Draft;
                None
            }
        };

        self.state.audit().record(
            &approver.id,
            Transition::changed(
                SubjectType::PayrollRecord,
                reference.to_string(),
                from_status,
                record.status,
                serde_json::json!({
                    "round": step.round,
                    "level": level,
                    "decision": decision,
                    "notes": step.notes,
                }),
            ),
        )?;

        let stored = record.clone();
        let decided = step.clone();
        self.state.store().write(|data| -> EngineResult<()> {
            data.replace(stored)?;
            let steps = data.steps_mut(&reference);
            if let Some(slot) = steps
                .iter_mut()
                .rev()
                .find(|s| s.round == decided.round && s.level == decided.level)
            {
                *slot = decided;
            }
            if let Some(next) = next_step {
                steps.push(next);
            }
            Ok(())
        })?;

        info!(
            record = %reference,
            level,
            decision = %decision,
            approver = %approver.id,
            status = %record.status,
            "Approval decided"
        );

        self.state.notifier().notify(PayrollEvent::ApprovalDecided {
            record: reference,
            level,
            decision,
        });
        if let RecordStatus::PendingApproval { level: next } = record.status {
            self.state.notifier().notify(PayrollEvent::ApprovalRequested {
                record: reference,
                level: next,
            });
        }

        Ok(record)
    }

    /// Returns every approval step recorded for a version, oldest first.
    pub fn approval_history(&self, reference: &RecordRef) -> EngineResult<Vec<ApprovalStep>> {
        self.state.store().record(reference)?;
        Ok(self.state.store().approval_history(reference))
    }
}

/// Returns the record if it is the head of its chain.
fn current_head<'a>(data: &'a StoreData, reference: &RecordRef) -> EngineResult<&'a PayrollRecord> {
    let record = data.require_record(reference)?;
    if !data.is_head(reference) {
        debug!(record = %reference, "Stale record reference");
        return Err(EngineError::InvalidState {
            subject: reference.to_string(),
            expected: "current version".to_string(),
            actual: format!("superseded ({})", record.status),
        });
    }
    Ok(record)
}

#[cfg(test)]
mod tests;
