//! Error corrections for released payroll records.
//!
//! A released record is immutable. Mistakes are fixed by raising an
//! [`ErrorCorrection`] against it, which must be approved by an actor with
//! the configured correction-approver role before it is processed.
//! Processing produces a new version of the record (same id, version + 1)
//! that is released directly and becomes the head of the chain; the
//! original is marked `Corrected` and kept.
//!
//! Correction lifecycle:
//!
//! ```text
//! Requested ──approve──▶ Approved ──process──▶ Processed
//!     │                     │
//!     ├──reject──▶ Rejected │
//!     └──cancel──▶ Cancelled ◀──cancel──┘
//! ```

mod apply;

use rust_decimal::Decimal;
use tracing::info;

use crate::audit::Transition;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Actor, CorrectionId, CorrectionStatus, CorrectionType, ErrorCorrection, PayrollEvent,
    PayrollRecord, RecordId, RecordRef, RecordStatus, SubjectType,
};
use crate::state::EngineState;
use crate::store::StoreData;

pub use apply::apply_correction;

/// Manages the lifecycle of error corrections.
pub struct ErrorCorrectionManager {
    state: EngineState,
}

impl ErrorCorrectionManager {
    /// Creates a manager over the shared engine state.
    pub fn new(state: EngineState) -> Self {
        Self { state }
    }

    /// Raises a correction against a released record.
    ///
    /// The record must be the released head of its chain, and the change
    /// must apply to it (see [`apply_correction`]).
    pub fn create(
        &self,
        original: RecordRef,
        correction_type: CorrectionType,
        description: &str,
        requested_by: &Actor,
    ) -> EngineResult<ErrorCorrection> {
        if description.trim().is_empty() {
            return Err(EngineError::InvalidInput {
                field: "description".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let mut preview = self
            .state
            .store()
            .read(|data| released_head(data, &original).cloned())?;
        apply_correction(&mut preview, &correction_type)?;

        let correction = ErrorCorrection::requested(
            original,
            correction_type,
            description,
            requested_by.id.clone(),
            self.state.clock().now(),
        );

        self.state.audit().record(
            &requested_by.id,
            Transition::created(
                SubjectType::ErrorCorrection,
                correction.id.to_string(),
                correction.status,
                serde_json::json!({
                    "original": correction.original,
                    "correction_type": correction.correction_type,
                    "description": correction.description,
                }),
            ),
        )?;
        let stored = correction.clone();
        self.state.store().write(|data| data.put_correction(stored));

        info!(
            correction = %correction.id,
            original = %original,
            requested_by = %requested_by.id,
            "Error correction requested"
        );
        self.notify_status(&correction);

        Ok(correction)
    }

    /// Approves a requested correction.
    pub fn approve(
        &self,
        id: CorrectionId,
        approver: &Actor,
        notes: Option<String>,
    ) -> EngineResult<ErrorCorrection> {
        self.decide(id, approver, notes, CorrectionStatus::Approved)
    }

    /// Rejects a requested correction.
    pub fn reject(
        &self,
        id: CorrectionId,
        approver: &Actor,
        notes: Option<String>,
    ) -> EngineResult<ErrorCorrection> {
        self.decide(id, approver, notes, CorrectionStatus::Rejected)
    }

    fn decide(
        &self,
        id: CorrectionId,
        approver: &Actor,
        notes: Option<String>,
        outcome: CorrectionStatus,
    ) -> EngineResult<ErrorCorrection> {
        let role = &self.state.config().approval_chain().correction_approver_role;
        if !approver.has_role(role) {
            return Err(EngineError::Unauthorized {
                actor: approver.id.clone(),
                required_role: role.clone(),
            });
        }

        let _lease = self.state.correction_leases().acquire(id)?;
        let mut correction = self.state.store().correction(&id)?;
        ensure_status(&correction, &[CorrectionStatus::Requested])?;
        if correction.requested_by == approver.id {
            return Err(EngineError::Unauthorized {
                actor: approver.id.clone(),
                required_role: format!("{} other than the requester", role),
            });
        }

        let from_status = correction.status;
        correction.status = outcome;
        correction.approver = Some(approver.id.clone());
        correction.decided_at = Some(self.state.clock().now());
        correction.decision_notes = notes;

        self.state.audit().record(
            &approver.id,
            Transition::changed(
                SubjectType::ErrorCorrection,
                id.to_string(),
                from_status,
                outcome,
                serde_json::json!({ "notes": correction.decision_notes }),
            ),
        )?;
        let stored = correction.clone();
        self.state.store().write(|data| data.put_correction(stored));

        info!(
            correction = %id,
            approver = %approver.id,
            status = %outcome,
            "Error correction decided"
        );
        self.notify_status(&correction);

        Ok(correction)
    }

    /// Applies an approved correction, producing and releasing a new
    /// version of the record.
    ///
    /// Processing happens at most once: a second call fails with
    /// `AlreadyProcessed` and produces nothing.
    pub fn process(&self, id: CorrectionId, processed_by: &Actor) -> EngineResult<PayrollRecord> {
        if let Some(role) = self.state.config().approval_chain().release_role.as_deref() {
            if !processed_by.has_role(role) {
                return Err(EngineError::Unauthorized {
                    actor: processed_by.id.clone(),
                    required_role: role.to_string(),
                });
            }
        }

        let _correction_lease = self.state.correction_leases().acquire(id)?;
        let mut correction = self.state.store().correction(&id)?;
        ensure_status(&correction, &[CorrectionStatus::Approved])?;

        let key = self.state.store().record(&correction.original)?.key();
        let _record_lease = self.state.record_leases().acquire(key)?;

        let mut original = self
            .state
            .store()
            .read(|data| released_head(data, &correction.original).cloned())?;

        let now = self.state.clock().now();
        let mut corrected = original.clone();
        corrected.version = original.version + 1;
        corrected.previous_version = Some(original.version);
        corrected.superseded_by = None;
        corrected.correction_id = Some(id);
        apply_correction(&mut corrected, &correction.correction_type)?;
        if corrected.net < Decimal::ZERO {
            return Err(EngineError::NegativeNetPay {
                employee_id: corrected.employee_id.clone(),
                net: corrected.net,
            });
        }
        corrected.status = RecordStatus::Released;
        corrected.calculated_at = Some(now);
        corrected.calculated_by = Some(processed_by.id.clone());
        corrected.released_at = Some(now);
        corrected.released_by = Some(processed_by.id.clone());

        original.status = RecordStatus::Corrected;
        original.superseded_by = Some(corrected.version);

        correction.status = CorrectionStatus::Processed;
        correction.processed_by = Some(processed_by.id.clone());
        correction.processed_at = Some(now);
        correction.produced = Some(corrected.reference());

        self.state.audit().record_all(
            &processed_by.id,
            vec![
                Transition::changed(
                    SubjectType::PayrollRecord,
                    original.reference().to_string(),
                    RecordStatus::Released,
                    RecordStatus::Corrected,
                    serde_json::json!({
                        "correction": id,
                        "superseded_by": corrected.version,
                    }),
                ),
                Transition::created(
                    SubjectType::PayrollRecord,
                    corrected.reference().to_string(),
                    corrected.status,
                    crate::calculation::amounts_payload(&corrected),
                ),
                Transition::changed(
                    SubjectType::ErrorCorrection,
                    id.to_string(),
                    CorrectionStatus::Approved,
                    CorrectionStatus::Processed,
                    serde_json::json!({ "produced": corrected.reference() }),
                ),
            ],
        )?;

        let (stored_original, stored_corrected, stored_correction) =
            (original.clone(), corrected.clone(), correction.clone());
        self.state.store().write(|data| -> EngineResult<()> {
            data.replace(stored_original)?;
            data.insert_head(stored_corrected);
            data.put_correction(stored_correction);
            Ok(())
        })?;

        info!(
            correction = %id,
            original = %original.reference(),
            corrected = %corrected.reference(),
            net = %corrected.net,
            "Error correction processed"
        );
        self.state.notifier().notify(PayrollEvent::RecordCorrected {
            original: original.reference(),
            corrected: corrected.reference(),
        });
        self.notify_status(&correction);

        Ok(corrected)
    }

    /// Withdraws a correction that has not been processed.
    ///
    /// Only the requester or a correction approver may cancel. A correction
    /// that is no longer open (processed, rejected or already cancelled)
    /// fails with `AlreadyProcessed`, so a retried cancel is safe.
    pub fn cancel(
        &self,
        id: CorrectionId,
        cancelled_by: &Actor,
        reason: &str,
    ) -> EngineResult<ErrorCorrection> {
        if reason.trim().is_empty() {
            return Err(EngineError::InvalidInput {
                field: "reason".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let _lease = self.state.correction_leases().acquire(id)?;
        let mut correction = self.state.store().correction(&id)?;
        if !matches!(
            correction.status,
            CorrectionStatus::Requested | CorrectionStatus::Approved
        ) {
            return Err(EngineError::AlreadyProcessed {
                correction: id.to_string(),
            });
        }

        let role = &self.state.config().approval_chain().correction_approver_role;
        if correction.requested_by != cancelled_by.id && !cancelled_by.has_role(role) {
            return Err(EngineError::Unauthorized {
                actor: cancelled_by.id.clone(),
                required_role: role.clone(),
            });
        }

        let from_status = correction.status;
        correction.status = CorrectionStatus::Cancelled;
        correction.cancelled_by = Some(cancelled_by.id.clone());
        correction.cancellation_reason = Some(reason.to_string());

        self.state.audit().record(
            &cancelled_by.id,
            Transition::changed(
                SubjectType::ErrorCorrection,
                id.to_string(),
                from_status,
                CorrectionStatus::Cancelled,
                serde_json::json!({ "reason": reason }),
            ),
        )?;
        let stored = correction.clone();
        self.state.store().write(|data| data.put_correction(stored));

        info!(correction = %id, cancelled_by = %cancelled_by.id, "Error correction cancelled");
        self.notify_status(&correction);

        Ok(correction)
    }

    /// Returns a correction.
    pub fn get(&self, id: CorrectionId) -> EngineResult<ErrorCorrection> {
        self.state.store().correction(&id)
    }

    /// Returns every correction raised against any version of a record
    /// chain, oldest first.
    pub fn corrections_for(&self, record: RecordId) -> Vec<ErrorCorrection> {
        self.state
            .store()
            .read(|data| data.corrections_for(record).into_iter().cloned().collect())
    }

    fn notify_status(&self, correction: &ErrorCorrection) {
        self.state.notifier().notify(PayrollEvent::CorrectionUpdated {
            correction: correction.id,
            status: correction.status.to_string(),
        });
    }
}

/// Returns the record if it is the released head of its chain.
fn released_head<'a>(
    data: &'a StoreData,
    reference: &RecordRef,
) -> EngineResult<&'a PayrollRecord> {
    let record = data.require_record(reference)?;
    if record.status != RecordStatus::Released || !data.is_head(reference) {
        return Err(EngineError::RecordNotReleased {
            record: reference.to_string(),
            status: record.status.to_string(),
        });
    }
    Ok(record)
}

fn ensure_status(correction: &ErrorCorrection, allowed: &[CorrectionStatus]) -> EngineResult<()> {
    if allowed.contains(&correction.status) {
        return Ok(());
    }
    if correction.status == CorrectionStatus::Processed {
        return Err(EngineError::AlreadyProcessed {
            correction: correction.id.to_string(),
        });
    }
    Err(EngineError::InvalidState {
        subject: correction.id.to_string(),
        expected: allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or "),
        actual: correction.status.to_string(),
    })
}
