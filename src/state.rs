//! Shared engine state.
//!
//! This module defines the state shared by the calculator, the branch
//! processor, the approval workflow and the correction manager.

use std::sync::Arc;

use crate::audit::{AuditLog, AuditTrailRecorder};
use crate::clock::Clock;
use crate::collaborators::Notifier;
use crate::config::ConfigLoader;
use crate::lease::LeaseTable;
use crate::models::{CorrectionId, PayrollKey};
use crate::processing::BranchRunKey;
use crate::store::PayrollStore;

/// Shared engine state.
///
/// Contains resources that are shared across all components, such as the
/// loaded configuration, the record store, the audit trail and the
/// leases that serialize writers of one `(employee, period)` or one
/// correction.
#[derive(Clone)]
pub struct EngineState {
    config: Arc<ConfigLoader>,
    store: Arc<PayrollStore>,
    audit: Arc<AuditTrailRecorder>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    record_leases: Arc<LeaseTable<PayrollKey>>,
    correction_leases: Arc<LeaseTable<CorrectionId>>,
    run_leases: Arc<LeaseTable<BranchRunKey>>,
}

impl EngineState {
    /// Creates a new engine state with an empty store.
    pub fn new(
        config: ConfigLoader,
        audit_log: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(PayrollStore::new()),
            audit: Arc::new(AuditTrailRecorder::new(audit_log, clock.clone())),
            clock,
            notifier,
            record_leases: Arc::new(LeaseTable::new()),
            correction_leases: Arc::new(LeaseTable::new()),
            run_leases: Arc::new(LeaseTable::new()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// Returns the record store.
    pub fn store(&self) -> &PayrollStore {
        &self.store
    }

    /// Returns the audit trail recorder.
    pub fn audit(&self) -> &AuditTrailRecorder {
        &self.audit
    }

    /// Returns the clock.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Returns the notifier.
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Returns the per-record lease table.
    pub fn record_leases(&self) -> &LeaseTable<PayrollKey> {
        &self.record_leases
    }

    /// Returns the per-correction lease table.
    pub fn correction_leases(&self) -> &LeaseTable<CorrectionId> {
        &self.correction_leases
    }

    /// Returns the per-branch-run lease table.
    pub fn run_leases(&self) -> &LeaseTable<BranchRunKey> {
        &self.run_leases
    }
}
