//! Branch-wide payroll runs.
//!
//! A run calculates every active employee of a branch for one period. Each
//! employee is an independent unit of work: a failure is reported as that
//! employee's outcome and never aborts the run. Calculations run on the
//! blocking pool, at most `worker_pool_size` at a time.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::Transition;
use crate::calculation::PayrollCalculator;
use crate::collaborators::{CompensationInputProvider, EmployeeDirectory};
use crate::compliance::{ComplianceValidator, ComplianceViolation};
use crate::config::RuleSet;
use crate::error::{EngineError, EngineResult};
use crate::models::{Actor, PayPeriod, PayrollRecord, SubjectType};
use crate::state::EngineState;

/// Identifies a run: one branch, one period.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchRunKey {
    /// The branch.
    pub branch_id: String,
    /// The pay period.
    pub period: PayPeriod,
}

impl BranchRunKey {
    /// Creates a key.
    pub fn new(branch_id: impl Into<String>, period: PayPeriod) -> Self {
        Self {
            branch_id: branch_id.into(),
            period,
        }
    }
}

impl fmt::Display for BranchRunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.branch_id, self.period)
    }
}

/// Cancels a run from outside. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct BranchRunHandle {
    cancelled: Arc<AtomicBool>,
}

impl BranchRunHandle {
    /// Creates a handle that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Employees that have not started are skipped;
    /// calculations already under way finish and stay committed.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every employee was attempted.
    Completed,
    /// The run was cancelled and some employees were skipped.
    Partial,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::Partial => f.write_str("partial"),
        }
    }
}

/// What happened to one employee in a run.
#[derive(Debug)]
pub enum EmployeeOutcome {
    /// The record was calculated and committed.
    Calculated {
        /// The committed record.
        record: PayrollRecord,
        /// Advisory compliance findings for the record.
        violations: Vec<ComplianceViolation>,
    },
    /// Inputs could not be fetched or the calculation failed.
    Failed {
        /// Why.
        error: EngineError,
    },
    /// The run was cancelled before this employee started.
    Skipped,
}

/// One employee's line in a run report.
#[derive(Debug)]
pub struct EmployeeRunOutcome {
    /// The employee.
    pub employee_id: String,
    /// The outcome.
    pub outcome: EmployeeOutcome,
}

/// The result of a branch run, one outcome per employee in directory order.
#[derive(Debug)]
pub struct BranchRunReport {
    /// Identifies the run in the audit trail.
    pub run_id: Uuid,
    /// The branch.
    pub branch_id: String,
    /// The pay period.
    pub period: PayPeriod,
    /// How the run ended.
    pub status: RunStatus,
    /// Per-employee outcomes.
    pub outcomes: Vec<EmployeeRunOutcome>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Set when the closing audit entry could not be written. The records
    /// in `outcomes` are committed either way.
    pub audit_error: Option<EngineError>,
}

impl BranchRunReport {
    /// Records calculated by the run.
    pub fn calculated(&self) -> impl Iterator<Item = &PayrollRecord> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            EmployeeOutcome::Calculated { record, .. } => Some(record),
            _ => None,
        })
    }

    /// Employees that failed, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &EngineError)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            EmployeeOutcome::Failed { error } => Some((o.employee_id.as_str(), error)),
            _ => None,
        })
    }

    /// Number of employees skipped by cancellation.
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, EmployeeOutcome::Skipped))
            .count()
    }
}

/// Runs the calculator over every active employee of a branch.
#[derive(Clone)]
pub struct BranchPayrollProcessor {
    state: EngineState,
    calculator: PayrollCalculator,
    directory: Arc<dyn EmployeeDirectory>,
    inputs: Arc<dyn CompensationInputProvider>,
}

impl BranchPayrollProcessor {
    /// Creates a processor over the shared engine state.
    pub fn new(
        state: EngineState,
        directory: Arc<dyn EmployeeDirectory>,
        inputs: Arc<dyn CompensationInputProvider>,
    ) -> Self {
        Self {
            calculator: PayrollCalculator::new(state.clone()),
            state,
            directory,
            inputs,
        }
    }

    /// Processes a branch to completion.
    pub async fn process_branch(
        &self,
        branch_id: &str,
        period: PayPeriod,
        actor: &Actor,
    ) -> EngineResult<BranchRunReport> {
        self.process_branch_with(branch_id, period, actor, &BranchRunHandle::new())
            .await
    }

    /// Processes a branch, stopping early if `handle` is cancelled.
    ///
    /// # Errors
    ///
    /// Fails as a whole only when the run cannot start: another run for the
    /// same branch and period is in flight (`ProcessingInProgress`), the
    /// branch has no usable rule set, the directory is unavailable, or the
    /// run start cannot be audited. Per-employee failures are outcomes. Once
    /// employees have been attempted the report is always returned; a failed
    /// closing audit entry is carried in [`BranchRunReport::audit_error`].
    pub async fn process_branch_with(
        &self,
        branch_id: &str,
        period: PayPeriod,
        actor: &Actor,
        handle: &BranchRunHandle,
    ) -> EngineResult<BranchRunReport> {
        let key = BranchRunKey::new(branch_id, period);
        let _lease = self.state.run_leases().try_acquire(key).ok_or_else(|| {
            warn!(branch_id = %branch_id, period = %period, "Branch run already in progress");
            EngineError::ProcessingInProgress {
                branch_id: branch_id.to_string(),
                period: period.to_string(),
            }
        })?;

        let rule_set = self.state.config().rule_set_for_branch(branch_id)?;
        let employees = self.directory.active_employees(branch_id)?;

        let run_id = Uuid::new_v4();
        let started_at = self.state.clock().now();
        self.state.audit().record(
            &actor.id,
            Transition::created(
                SubjectType::BranchRun,
                run_id.to_string(),
                "running",
                serde_json::json!({
                    "branch_id": branch_id,
                    "period": period.to_string(),
                    "rule_set": rule_set.id,
                    "employees": employees.len(),
                }),
            ),
        )?;
        info!(
            run_id = %run_id,
            branch_id = %branch_id,
            period = %period,
            employees = employees.len(),
            "Branch run started"
        );

        let pool_size = self.state.config().settings().worker_pool_size.max(1);
        let semaphore = Arc::new(Semaphore::new(pool_size));
        let mut tasks = JoinSet::new();

        for (index, employee_id) in employees.iter().enumerate() {
            let semaphore = semaphore.clone();
            let handle = handle.clone();
            let job = EmployeeJob {
                processor: self.clone(),
                employee_id: employee_id.clone(),
                branch_id: branch_id.to_string(),
                period,
                rule_set: rule_set.clone(),
                actor: actor.clone(),
            };
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, EmployeeOutcome::Skipped);
                };
                if handle.is_cancelled() {
                    return (index, EmployeeOutcome::Skipped);
                }
                let employee_id = job.employee_id.clone();
                let outcome = match tokio::task::spawn_blocking(move || job.run()).await {
                    Ok(outcome) => outcome,
                    Err(err) => EmployeeOutcome::Failed {
                        error: EngineError::WorkerFailed {
                            employee_id,
                            message: err.to_string(),
                        },
                    },
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<EmployeeOutcome>> = employees.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(outcome);
                    }
                }
                Err(err) => warn!(run_id = %run_id, error = %err, "Branch worker task failed"),
            }
        }

        let outcomes: Vec<EmployeeRunOutcome> = employees
            .into_iter()
            .zip(slots)
            .map(|(employee_id, slot)| {
                let outcome = slot.unwrap_or_else(|| EmployeeOutcome::Failed {
                    error: EngineError::WorkerFailed {
                        employee_id: employee_id.clone(),
                        message: "worker task terminated".to_string(),
                    },
                });
                EmployeeRunOutcome {
                    employee_id,
                    outcome,
                }
            })
            .collect();

        let mut report = BranchRunReport {
            run_id,
            branch_id: branch_id.to_string(),
            period,
            status: RunStatus::Completed,
            outcomes,
            started_at,
            finished_at: self.state.clock().now(),
            audit_error: None,
        };
        if report.skipped() > 0 {
            report.status = RunStatus::Partial;
        }

        let calculated = report.calculated().count();
        let failed = report.failures().count();
        let skipped = report.skipped();
        if let Err(err) = self.state.audit().record(
            &actor.id,
            Transition::changed(
                SubjectType::BranchRun,
                run_id.to_string(),
                "running",
                report.status,
                serde_json::json!({
                    "calculated": calculated,
                    "failed": failed,
                    "skipped": skipped,
                    "failures": report
                        .failures()
                        .map(|(employee_id, err)| serde_json::json!({
                            "employee_id": employee_id,
                            "error": err.to_string(),
                        }))
                        .collect::<Vec<_>>(),
                }),
            ),
        ) {
            error!(
                run_id = %run_id,
                branch_id = %branch_id,
                period = %period,
                error = %err,
                "Branch run finished but could not be audited"
            );
            for line in &report.outcomes {
                let outcome = match &line.outcome {
                    EmployeeOutcome::Calculated { record, .. } => record.reference().to_string(),
                    EmployeeOutcome::Failed { error } => error.to_string(),
                    EmployeeOutcome::Skipped => "skipped".to_string(),
                };
                warn!(
                    run_id = %run_id,
                    employee_id = %line.employee_id,
                    outcome = %outcome,
                    "Unaudited run outcome"
                );
            }
            report.audit_error = Some(err);
        }

        info!(
            run_id = %run_id,
            branch_id = %branch_id,
            period = %period,
            status = %report.status,
            calculated,
            failed,
            skipped,
            "Branch run finished"
        );

        Ok(report)
    }
}

/// The blocking work for one employee.
struct EmployeeJob {
    processor: BranchPayrollProcessor,
    employee_id: String,
    branch_id: String,
    period: PayPeriod,
    rule_set: Arc<RuleSet>,
    actor: Actor,
}

impl EmployeeJob {
    fn run(self) -> EmployeeOutcome {
        match self.calculate() {
            Ok((record, violations)) => EmployeeOutcome::Calculated { record, violations },
            Err(error) => EmployeeOutcome::Failed { error },
        }
    }

    fn calculate(&self) -> EngineResult<(PayrollRecord, Vec<ComplianceViolation>)> {
        let inputs = self
            .processor
            .inputs
            .employee_inputs(&self.employee_id, self.period)
            .inspect_err(|err| {
                warn!(
                    employee_id = %self.employee_id,
                    period = %self.period,
                    error = %err,
                    "Inputs unavailable"
                );
            })?;

        let record = self.processor.calculator.calculate(
            &self.employee_id,
            &self.branch_id,
            self.period,
            &inputs,
            &self.rule_set,
            &self.actor,
        )?;

        let violations = ComplianceValidator::new(self.processor.state.config())
            .check(&record)
            .unwrap_or_else(|err| {
                warn!(record = %record.reference(), error = %err, "Compliance check skipped");
                Vec::new()
            });

        Ok((record, violations))
    }
}
