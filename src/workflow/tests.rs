use std::sync::{Arc, Barrier};
use std::thread;

use chrono::Duration;

use super::*;
use crate::audit::AuditLog;
use crate::calculation::PayrollCalculator;
use crate::clock::Clock;
use crate::test_support::{
    FakeRenderer, Harness, clerk, harness, january, manager, officer, standard_inputs,
    usd_rule_set,
};

fn calculated(state: &EngineState, employee_id: &str) -> RecordRef {
    PayrollCalculator::new(state.clone())
        .calculate(
            employee_id,
            "branch_north",
            january(),
            &standard_inputs(),
            &usd_rule_set(),
            &officer(),
        )
        .unwrap()
        .reference()
}

fn workflow(state: &EngineState) -> (PayslipApprovalWorkflow, Arc<FakeRenderer>) {
    let renderer = Arc::new(FakeRenderer::default());
    (
        PayslipApprovalWorkflow::new(state.clone(), renderer.clone()),
        renderer,
    )
}

fn approve_all(workflow: &PayslipApprovalWorkflow, reference: RecordRef) -> PayrollRecord {
    workflow
        .decide(reference, 1, &officer(), Decision::Approved, None)
        .unwrap();
    workflow
        .decide(reference, 2, &manager(), Decision::Approved, None)
        .unwrap()
}

#[test]
fn test_submit_opens_level_one() {
    let Harness { state, notifier, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");

    let submitted = workflow.submit_for_approval(&[reference], &officer()).unwrap();

    assert_eq!(submitted[0].status, RecordStatus::PendingApproval { level: 1 });
    let history = workflow.approval_history(&reference).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].round, 1);
    assert_eq!(history[0].level, 1);
    assert_eq!(history[0].decision, Decision::Pending);
    assert!(notifier.events().contains(&PayrollEvent::ApprovalRequested {
        record: reference,
        level: 1
    }));
}

#[test]
fn test_submit_is_all_or_nothing() {
    let Harness { state, audit_log, .. } = harness();
    let (workflow, _) = workflow(&state);
    let good = calculated(&state, "emp_001");
    let draft = calculated(&state, "emp_002");
    state
        .store()
        .write(|data| {
            let mut record = data.record(&draft).cloned().unwrap();
            record.status = RecordStatus::Draft;
            data.replace(record)
        })
        .unwrap();
    let entries_before = audit_log.entries().unwrap().len();

    match workflow.submit_for_approval(&[good, draft], &officer()) {
        Err(EngineError::InvalidState { subject, actual, .. }) => {
            assert_eq!(subject, draft.to_string());
            assert_eq!(actual, "draft");
        }
        other => panic!("Expected InvalidState, got {:?}", other),
    }

    assert_eq!(
        state.store().record(&good).unwrap().status,
        RecordStatus::Calculated
    );
    assert!(workflow.approval_history(&good).unwrap().is_empty());
    assert_eq!(audit_log.entries().unwrap().len(), entries_before);
}

#[test]
fn test_submit_unknown_record() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let mut reference = calculated(&state, "emp_001");
    reference.version = 9;

    assert!(matches!(
        workflow.submit_for_approval(&[reference], &officer()),
        Err(EngineError::RecordNotFound { .. })
    ));
}

#[test]
fn test_decide_requires_level_role() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();

    match workflow.decide(reference, 1, &clerk(), Decision::Approved, None) {
        Err(EngineError::Unauthorized { actor, required_role }) => {
            assert_eq!(actor, "clerk_7");
            assert_eq!(required_role, "payroll_officer");
        }
        other => panic!("Expected Unauthorized, got {:?}", other),
    }
}

#[test]
fn test_decide_at_wrong_level_is_mismatch() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();

    match workflow.decide(reference, 2, &manager(), Decision::Approved, None) {
        Err(EngineError::LevelMismatch { pending, requested, .. }) => {
            assert_eq!(pending, 1);
            assert_eq!(requested, 2);
        }
        other => panic!("Expected LevelMismatch, got {:?}", other),
    }
}

#[test]
fn test_pending_is_not_a_decision() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();

    assert!(matches!(
        workflow.decide(reference, 1, &officer(), Decision::Pending, None),
        Err(EngineError::InvalidInput { .. })
    ));
}

#[test]
fn test_decide_on_calculated_record_is_invalid_state() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");

    assert!(matches!(
        workflow.decide(reference, 1, &officer(), Decision::Approved, None),
        Err(EngineError::InvalidState { .. })
    ));
}

#[test]
fn test_second_approval_of_same_level_is_mismatch() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();

    workflow
        .decide(reference, 1, &officer(), Decision::Approved, None)
        .unwrap();
    assert!(matches!(
        workflow.decide(reference, 1, &officer(), Decision::Approved, None),
        Err(EngineError::LevelMismatch { pending: 2, requested: 1, .. })
    ));
}

#[test]
fn test_decide_while_record_is_leased() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();

    let key = state.store().record(&reference).unwrap().key();
    let _held = state.record_leases().acquire(key).unwrap();

    let err = workflow
        .decide(reference, 1, &officer(), Decision::Approved, None)
        .unwrap_err();
    assert!(err.kind().is_retryable());
}

#[test]
fn test_concurrent_decisions_on_same_level_admit_one() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();

    let barrier = Barrier::new(2);
    let results: Vec<EngineResult<PayrollRecord>> = thread::scope(|scope| {
        let racers: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    workflow.decide(reference, 1, &officer(), Decision::Approved, None)
                })
            })
            .collect();
        racers.into_iter().map(|r| r.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.into_iter().find_map(Result::err).unwrap();
    assert!(
        matches!(
            loser,
            EngineError::ConcurrentModification { .. } | EngineError::LevelMismatch { .. }
        ),
        "unexpected error: {:?}",
        loser
    );

    let history = workflow.approval_history(&reference).unwrap();
    let level_one_approvals = history
        .iter()
        .filter(|s| s.level == 1 && s.decision == Decision::Approved)
        .count();
    assert_eq!(level_one_approvals, 1);
}

#[test]
fn test_full_approval_then_release() {
    let Harness { state, notifier, audit_log, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();

    let approved = approve_all(&workflow, reference);
    assert_eq!(approved.status, RecordStatus::Approved);

    let outcomes = workflow.release(&[reference], &officer());
    let released = outcomes[0].result.as_ref().unwrap();
    assert_eq!(released.status, RecordStatus::Released);
    assert_eq!(released.released_by.as_deref(), Some("officer_1"));
    assert!(released.released_at.is_some());

    let history = workflow.approval_history(&reference).unwrap();
    let levels: Vec<(u8, Decision)> = history.iter().map(|s| (s.level, s.decision)).collect();
    assert_eq!(levels, vec![(1, Decision::Approved), (2, Decision::Approved)]);
    assert_eq!(history[1].approver.as_deref(), Some("manager_1"));

    assert!(notifier.events().iter().any(|e| matches!(
        e,
        PayrollEvent::PayslipReleased { record, document_bytes, .. }
            if *record == reference && *document_bytes > 0
    )));

    let transitions: Vec<String> = audit_log
        .query_by_subject(SubjectType::PayrollRecord, &reference.to_string())
        .unwrap()
        .into_iter()
        .filter(|e| e.is_transition())
        .map(|e| e.to_state)
        .collect();
    assert_eq!(
        transitions,
        vec![
            "calculated",
            "pending_approval(1)",
            "pending_approval(2)",
            "approved",
            "released"
        ]
    );
}

#[test]
fn test_rejection_returns_to_draft_and_opens_new_round() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();
    workflow
        .decide(reference, 1, &officer(), Decision::Approved, None)
        .unwrap();

    let rejected = workflow
        .decide(
            reference,
            2,
            &manager(),
            Decision::Rejected,
            Some("overtime not signed off".to_string()),
        )
        .unwrap();
    assert_eq!(rejected.status, RecordStatus::Draft);

    // recalculate and resubmit on the same version
    assert_eq!(calculated(&state, "emp_001"), reference);
    workflow.submit_for_approval(&[reference], &officer()).unwrap();
    approve_all(&workflow, reference);

    let outcomes = workflow.release(&[reference], &officer());
    assert!(outcomes[0].result.is_ok());

    let history = workflow.approval_history(&reference).unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1].decision, Decision::Rejected);
    assert_eq!(history[1].notes.as_deref(), Some("overtime not signed off"));
    assert!(history[2..].iter().all(|s| s.round == 2));
}

#[test]
fn test_release_is_per_record() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let approved = calculated(&state, "emp_001");
    let pending = calculated(&state, "emp_002");
    workflow
        .submit_for_approval(&[approved, pending], &officer())
        .unwrap();
    approve_all(&workflow, approved);

    let outcomes = workflow.release(&[approved, pending], &officer());

    assert!(outcomes[0].result.is_ok());
    assert_eq!(outcomes[1].record, pending);
    assert!(matches!(
        outcomes[1].result,
        Err(EngineError::InvalidState { .. })
    ));
}

#[test]
fn test_release_requires_release_role() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();
    approve_all(&workflow, reference);

    let outcomes = workflow.release(&[reference], &manager());
    assert!(matches!(
        outcomes[0].result,
        Err(EngineError::Unauthorized { .. })
    ));
}

#[test]
fn test_render_failure_leaves_record_approved() {
    let Harness { state, audit_log, .. } = harness();
    let (workflow, renderer) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();
    approve_all(&workflow, reference);
    renderer.fail_for("emp_001");
    let entries_before = audit_log.entries().unwrap().len();

    let outcomes = workflow.release(&[reference], &officer());

    assert!(matches!(
        outcomes[0].result,
        Err(EngineError::RenderFailed { .. })
    ));
    assert_eq!(
        state.store().record(&reference).unwrap().status,
        RecordStatus::Approved
    );
    assert_eq!(audit_log.entries().unwrap().len(), entries_before);
}

#[test]
fn test_audit_failure_blocks_decision() {
    let Harness { state, audit_log, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();

    audit_log.fail_writes(true);
    assert!(matches!(
        workflow.decide(reference, 1, &officer(), Decision::Approved, None),
        Err(EngineError::AuditWriteFailed { .. })
    ));
    assert_eq!(
        state.store().record(&reference).unwrap().status,
        RecordStatus::PendingApproval { level: 1 }
    );
    assert_eq!(
        workflow.approval_history(&reference).unwrap()[0].decision,
        Decision::Pending
    );
}

#[test]
fn test_overdue_approvals() {
    let Harness { state, clock, .. } = harness();
    let (workflow, _) = workflow(&state);
    let reference = calculated(&state, "emp_001");
    workflow.submit_for_approval(&[reference], &officer()).unwrap();
    let submitted_at = clock.now();

    let sla = Duration::hours(48);
    assert!(
        workflow
            .overdue_approvals(submitted_at + Duration::hours(47), sla)
            .is_empty()
    );

    let overdue = workflow.overdue_approvals(submitted_at + Duration::hours(49), sla);
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].record, reference);
    assert_eq!(overdue[0].level, 1);
    assert_eq!(overdue[0].waiting, Duration::hours(49));
}

#[tokio::test]
async fn test_sla_sweep_runs_until_aborted() {
    let Harness { state, .. } = harness();
    let (workflow, _) = workflow(&state);

    let handle = workflow.spawn_sla_sweep(std::time::Duration::from_millis(5));
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(!handle.is_finished());

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
}
