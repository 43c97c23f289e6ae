//! Approval SLA reporting.

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

use crate::models::{Decision, RecordRef, RecordStatus};

use super::PayslipApprovalWorkflow;

/// A record that has waited at one approval level longer than the SLA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueApproval {
    /// The waiting record.
    pub record: RecordRef,
    /// The employee the record pays.
    pub employee_id: String,
    /// The level awaiting a decision.
    pub level: u8,
    /// When the level was opened.
    pub requested_at: DateTime<Utc>,
    /// How long the level has been waiting.
    pub waiting: Duration,
}

impl PayslipApprovalWorkflow {
    /// Lists records whose pending approval level was opened more than
    /// `sla` before `now`, oldest first. Reporting only.
    pub fn overdue_approvals(&self, now: DateTime<Utc>, sla: Duration) -> Vec<OverdueApproval> {
        let mut overdue: Vec<OverdueApproval> = self.state.store().read(|data| {
            data.heads()
                .filter_map(|record| {
                    let RecordStatus::PendingApproval { level } = record.status else {
                        return None;
                    };
                    let reference = record.reference();
                    let step = data
                        .steps(&reference)
                        .iter()
                        .rev()
                        .find(|s| s.level == level && s.decision == Decision::Pending)?;
                    let waiting = now - step.requested_at;
                    (waiting > sla).then(|| OverdueApproval {
                        record: reference,
                        employee_id: record.employee_id.clone(),
                        level,
                        requested_at: step.requested_at,
                        waiting,
                    })
                })
                .collect()
        });
        overdue.sort_by_key(|o| o.requested_at);
        overdue
    }

    /// Spawns a background task that logs overdue approvals every `interval`.
    ///
    /// Must be called from within a tokio runtime. The task runs until the
    /// returned handle is aborted.
    pub fn spawn_sla_sweep(&self, interval: std::time::Duration) -> JoinHandle<()> {
        let workflow = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let sla = Duration::hours(workflow.state.config().settings().approval_sla_hours);
                let now = workflow.state.clock().now();
                for item in workflow.overdue_approvals(now, sla) {
                    tracing::warn!(
                        record = %item.record,
                        employee_id = %item.employee_id,
                        level = item.level,
                        waiting_hours = item.waiting.num_hours(),
                        "Approval overdue"
                    );
                }
            }
        })
    }
}
