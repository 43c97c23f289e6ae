//! Fakes and fixtures shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::audit::{AuditLog, MemoryAuditLog};
use crate::clock::FixedClock;
use crate::collaborators::{
    CompensationInputProvider, EmployeeDirectory, Notifier, PayslipRenderer,
};
use crate::config::{
    AllowanceRule, ApprovalChain, ApprovalLevel, ComplianceConfig, ComplianceRules, ConfigLoader,
    DeductionBasis, DeductionRule, EngineSettings, ExchangeRate, RuleSet,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Actor, AuditEntry, Currency, EmployeeInputs, PayPeriod, PayrollEvent, PayrollRecord,
};
use crate::state::EngineState;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 5, 9, 0, 0).unwrap()
}

pub fn january() -> PayPeriod {
    PayPeriod::new(2026, 1).unwrap()
}

pub fn standard_inputs() -> EmployeeInputs {
    EmployeeInputs::new(dec("4000.00"), "USD", dec("160"))
}

pub fn officer() -> Actor {
    Actor::new("officer_1", ["payroll_officer"])
}

pub fn manager() -> Actor {
    Actor::new("manager_1", ["hr_manager"])
}

pub fn second_manager() -> Actor {
    Actor::new("manager_2", ["hr_manager"])
}

pub fn clerk() -> Actor {
    Actor::new("clerk_7", ["payroll_clerk"])
}

pub fn usd_rule_set() -> RuleSet {
    RuleSet {
        id: "standard_usd".to_string(),
        version: 3,
        jurisdiction: "us_default".to_string(),
        currency: Currency::new("USD", 2),
        standard_monthly_hours: dec("160"),
        hours_per_leave_day: dec("8"),
        overtime_multiplier: dec("1.5"),
        allowances: vec![AllowanceRule {
            name: "Transport allowance".to_string(),
            amount: dec("150.00"),
        }],
        statutory_deductions: vec![
            DeductionRule {
                name: "Social security".to_string(),
                basis: DeductionBasis::PercentOfGross { rate: dec("0.062") },
                cap: Some(dec("500.00")),
            },
            DeductionRule {
                name: "Health insurance".to_string(),
                basis: DeductionBasis::Fixed {
                    amount: dec("120.00"),
                },
                cap: None,
            },
        ],
        exchange_rates: vec![ExchangeRate {
            from: "EUR".to_string(),
            rate: dec("1.08"),
        }],
    }
}

pub fn eur_rule_set() -> RuleSet {
    RuleSet {
        id: "standard_eur".to_string(),
        version: 1,
        jurisdiction: "de_default".to_string(),
        currency: Currency::new("EUR", 2),
        standard_monthly_hours: dec("168"),
        hours_per_leave_day: dec("8"),
        overtime_multiplier: dec("1.25"),
        allowances: vec![],
        statutory_deductions: vec![DeductionRule {
            name: "Pension insurance".to_string(),
            basis: DeductionBasis::PercentOfGross { rate: dec("0.093") },
            cap: None,
        }],
        exchange_rates: vec![ExchangeRate {
            from: "USD".to_string(),
            rate: dec("0.92"),
        }],
    }
}

pub fn test_config() -> ConfigLoader {
    let settings = EngineSettings {
        worker_pool_size: 2,
        approval_sla_hours: 48,
        payslip_template: "standard_payslip".to_string(),
        default_rule_set: "standard_usd".to_string(),
        branch_rule_sets: HashMap::from([
            ("branch_north".to_string(), "standard_usd".to_string()),
            ("branch_berlin".to_string(), "standard_eur".to_string()),
        ]),
    };
    let approval = ApprovalChain {
        levels: vec![
            ApprovalLevel {
                level: 1,
                name: "Payroll officer review".to_string(),
                role: "payroll_officer".to_string(),
            },
            ApprovalLevel {
                level: 2,
                name: "HR manager sign-off".to_string(),
                role: "hr_manager".to_string(),
            },
        ],
        release_role: Some("payroll_officer".to_string()),
        correction_approver_role: "hr_manager".to_string(),
    };
    let compliance = ComplianceConfig {
        jurisdictions: HashMap::from([(
            "us_default".to_string(),
            ComplianceRules {
                minimum_net_pay: Some(dec("1200.00")),
                max_total_deductions: None,
                max_deduction_ratio: Some(dec("0.50")),
                max_overtime_ratio: Some(dec("0.40")),
            },
        )]),
    };
    ConfigLoader::from_parts(
        settings,
        approval,
        compliance,
        vec![usd_rule_set(), eur_rule_set()],
    )
    .unwrap()
}

/// A memory audit log whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct TestAuditLog {
    inner: MemoryAuditLog,
    failing: AtomicBool,
}

impl TestAuditLog {
    pub fn fail_writes(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }
}

impl AuditLog for TestAuditLog {
    fn append(&self, entries: Vec<AuditEntry>) -> EngineResult<Vec<AuditEntry>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::AuditWriteFailed {
                message: "disk full".to_string(),
            });
        }
        self.inner.append(entries)
    }

    fn entries(&self) -> EngineResult<Vec<AuditEntry>> {
        self.inner.entries()
    }
}

/// An audit log that refuses every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingAuditLog;

impl AuditLog for FailingAuditLog {
    fn append(&self, _entries: Vec<AuditEntry>) -> EngineResult<Vec<AuditEntry>> {
        Err(EngineError::AuditWriteFailed {
            message: "disk full".to_string(),
        })
    }

    fn entries(&self) -> EngineResult<Vec<AuditEntry>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<PayrollEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<PayrollEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: PayrollEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Debug, Default)]
pub struct StaticInputs {
    inputs: HashMap<String, Result<EmployeeInputs, String>>,
    delay: Option<Duration>,
}

impl StaticInputs {
    pub fn with(mut self, employee_id: &str, inputs: EmployeeInputs) -> Self {
        self.inputs.insert(employee_id.to_string(), Ok(inputs));
        self
    }

    pub fn unavailable(mut self, employee_id: &str, message: &str) -> Self {
        self.inputs
            .insert(employee_id.to_string(), Err(message.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl CompensationInputProvider for StaticInputs {
    fn employee_inputs(
        &self,
        employee_id: &str,
        _period: PayPeriod,
    ) -> EngineResult<EmployeeInputs> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match self.inputs.get(employee_id) {
            Some(Ok(inputs)) => Ok(inputs.clone()),
            Some(Err(message)) => Err(EngineError::InputUnavailable {
                employee_id: employee_id.to_string(),
                message: message.clone(),
            }),
            None => Err(EngineError::InputUnavailable {
                employee_id: employee_id.to_string(),
                message: "no attendance data".to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct StaticDirectory {
    branches: HashMap<String, Vec<String>>,
}

impl StaticDirectory {
    pub fn with(mut self, branch_id: &str, employees: &[&str]) -> Self {
        self.branches.insert(
            branch_id.to_string(),
            employees.iter().map(|e| e.to_string()).collect(),
        );
        self
    }
}

impl EmployeeDirectory for StaticDirectory {
    fn active_employees(&self, branch_id: &str) -> EngineResult<Vec<String>> {
        Ok(self.branches.get(branch_id).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct FakeRenderer {
    fail_for: Mutex<HashSet<String>>,
}

impl FakeRenderer {
    pub fn fail_for(&self, employee_id: &str) {
        self.fail_for.lock().unwrap().insert(employee_id.to_string());
    }
}

impl PayslipRenderer for FakeRenderer {
    fn render(&self, record: &PayrollRecord, template_id: &str) -> EngineResult<Vec<u8>> {
        if self.fail_for.lock().unwrap().contains(&record.employee_id) {
            return Err(EngineError::RenderFailed {
                record: record.reference().to_string(),
                message: "template error".to_string(),
            });
        }
        Ok(format!("{}:{}:{}", template_id, record.reference(), record.net).into_bytes())
    }
}

pub struct Harness {
    pub state: EngineState,
    pub clock: Arc<FixedClock>,
    pub audit_log: Arc<TestAuditLog>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness() -> Harness {
    let clock = Arc::new(FixedClock::new(now()));
    let audit_log = Arc::new(TestAuditLog::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = EngineState::new(
        test_config(),
        audit_log.clone(),
        clock.clone(),
        notifier.clone(),
    );
    Harness {
        state,
        clock,
        audit_log,
        notifier,
    }
}

pub fn failing_harness() -> Harness {
    let harness = harness();
    harness.audit_log.fail_writes(true);
    harness
}
