//! In-memory persistence for payroll state.
//!
//! Records are kept as an arena of versions keyed by [`RecordRef`], with an
//! index from each `(employee, period)` key to its current head version.
//! Versions are never removed; a correction adds a version and moves the
//! head. Approval steps and corrections reference records by `RecordRef`.
//!
//! All reads and writes go through [`PayrollStore::read`] and
//! [`PayrollStore::write`], so a multi-entity change is applied atomically.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    ApprovalStep, CorrectionId, ErrorCorrection, PayrollKey, PayrollRecord, RecordId, RecordRef,
};

/// The stored state, accessible inside a read or write closure.
#[derive(Debug, Default)]
pub struct StoreData {
    records: HashMap<RecordRef, PayrollRecord>,
    heads: HashMap<PayrollKey, RecordRef>,
    approvals: HashMap<RecordRef, Vec<ApprovalStep>>,
    corrections: HashMap<CorrectionId, ErrorCorrection>,
}

impl StoreData {
    /// Returns a record version.
    pub fn record(&self, reference: &RecordRef) -> Option<&PayrollRecord> {
        self.records.get(reference)
    }

    /// Returns a record version or `RecordNotFound`.
    pub fn require_record(&self, reference: &RecordRef) -> EngineResult<&PayrollRecord> {
        self.records
            .get(reference)
            .ok_or_else(|| EngineError::RecordNotFound {
                record: reference.to_string(),
            })
    }

    /// Returns the head version for a key.
    pub fn head(&self, key: &PayrollKey) -> Option<&PayrollRecord> {
        self.heads.get(key).and_then(|r| self.records.get(r))
    }

    /// Returns true if `reference` is the head of its chain.
    pub fn is_head(&self, reference: &RecordRef) -> bool {
        self.records
            .get(reference)
            .and_then(|record| self.heads.get(&record.key()))
            .is_some_and(|head| head == reference)
    }

    /// Iterates over the head version of every chain.
    pub fn heads(&self) -> impl Iterator<Item = &PayrollRecord> {
        self.heads.values().filter_map(|r| self.records.get(r))
    }

    /// Stores `record` as a new version and makes it the head of its chain.
    pub fn insert_head(&mut self, record: PayrollRecord) {
        let reference = record.reference();
        self.heads.insert(record.key(), reference);
        self.records.insert(reference, record);
    }

    /// Overwrites an existing version in place.
    pub fn replace(&mut self, record: PayrollRecord) -> EngineResult<()> {
        let reference = record.reference();
        match self.records.get_mut(&reference) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(EngineError::RecordNotFound {
                record: reference.to_string(),
            }),
        }
    }

    /// Returns every version of a chain, oldest first.
    pub fn versions(&self, id: RecordId) -> Vec<&PayrollRecord> {
        let mut versions: Vec<&PayrollRecord> =
            self.records.values().filter(|r| r.id == id).collect();
        versions.sort_by_key(|r| r.version);
        versions
    }

    /// Returns the approval steps recorded for a version, oldest first.
    pub fn steps(&self, reference: &RecordRef) -> &[ApprovalStep] {
        self.approvals
            .get(reference)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the mutable step list for a version.
    pub fn steps_mut(&mut self, reference: &RecordRef) -> &mut Vec<ApprovalStep> {
        self.approvals.entry(*reference).or_default()
    }

    /// Returns a correction.
    pub fn correction(&self, id: &CorrectionId) -> Option<&ErrorCorrection> {
        self.corrections.get(id)
    }

    /// Returns a correction or `CorrectionNotFound`.
    pub fn require_correction(&self, id: &CorrectionId) -> EngineResult<&ErrorCorrection> {
        self.corrections
            .get(id)
            .ok_or_else(|| EngineError::CorrectionNotFound {
                correction: id.to_string(),
            })
    }

    /// Inserts or overwrites a correction.
    pub fn put_correction(&mut self, correction: ErrorCorrection) {
        self.corrections.insert(correction.id, correction);
    }

    /// Returns the corrections raised against any version of a chain, oldest first.
    pub fn corrections_for(&self, id: RecordId) -> Vec<&ErrorCorrection> {
        let mut corrections: Vec<&ErrorCorrection> = self
            .corrections
            .values()
            .filter(|c| c.original.id == id)
            .collect();
        corrections.sort_by_key(|c| c.requested_at);
        corrections
    }
}

/// Thread-safe owner of [`StoreData`].
#[derive(Debug, Default)]
pub struct PayrollStore {
    data: Mutex<StoreData>,
}

impl PayrollStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with shared access to the data.
    pub fn read<R>(&self, f: impl FnOnce(&StoreData) -> R) -> R {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        f(&data)
    }

    /// Runs `f` with exclusive access to the data. Changes made by `f` are
    /// visible to other callers only once it returns.
    pub fn write<R>(&self, f: impl FnOnce(&mut StoreData) -> R) -> R {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut data)
    }

    /// Returns a copy of a record version.
    pub fn record(&self, reference: &RecordRef) -> EngineResult<PayrollRecord> {
        self.read(|data| data.require_record(reference).cloned())
    }

    /// Returns a copy of the head version for a key.
    pub fn head(&self, key: &PayrollKey) -> Option<PayrollRecord> {
        self.read(|data| data.head(key).cloned())
    }

    /// Returns copies of every version of a chain, oldest first.
    pub fn versions(&self, id: RecordId) -> Vec<PayrollRecord> {
        self.read(|data| data.versions(id).into_iter().cloned().collect())
    }

    /// Returns the approval steps of a version, oldest first.
    pub fn approval_history(&self, reference: &RecordRef) -> Vec<ApprovalStep> {
        self.read(|data| data.steps(reference).to_vec())
    }

    /// Returns a copy of a correction.
    pub fn correction(&self, id: &CorrectionId) -> EngineResult<ErrorCorrection> {
        self.read(|data| data.require_correction(id).cloned())
    }
}
