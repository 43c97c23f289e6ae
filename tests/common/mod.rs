//! In-memory collaborators and fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use payroll_engine::audit::MemoryAuditLog;
use payroll_engine::calculation::PayrollCalculator;
use payroll_engine::clock::FixedClock;
use payroll_engine::collaborators::{
    CompensationInputProvider, EmployeeDirectory, Notifier, PayslipRenderer,
};
use payroll_engine::config::{ConfigLoader, DeductionBasis, DeductionRule, RuleSet};
use payroll_engine::correction::ErrorCorrectionManager;
use payroll_engine::error::{EngineError, EngineResult};
use payroll_engine::models::{
    Actor, Currency, EmployeeInputs, PayPeriod, PayrollEvent, PayrollRecord,
};
use payroll_engine::processing::BranchPayrollProcessor;
use payroll_engine::state::EngineState;
use payroll_engine::workflow::PayslipApprovalWorkflow;

pub fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 5, 9, 0, 0).unwrap()
}

pub fn january() -> PayPeriod {
    PayPeriod::new(2026, 1).unwrap()
}

pub fn officer() -> Actor {
    Actor::new("officer_1", ["payroll_officer"])
}

pub fn hr_manager() -> Actor {
    Actor::new("manager_1", ["hr_manager"])
}

pub fn clerk() -> Actor {
    Actor::new("clerk_7", ["payroll_clerk"])
}

pub fn inputs(base: &str, hours: &str) -> EmployeeInputs {
    EmployeeInputs::new(decimal(base), "USD", decimal(hours))
}

/// A USD rule set with no allowances and a single fixed 400 deduction.
pub fn flat_rule_set() -> RuleSet {
    RuleSet {
        id: "flat_usd".to_string(),
        version: 1,
        jurisdiction: "us_default".to_string(),
        currency: Currency::new("USD", 2),
        standard_monthly_hours: decimal("160"),
        hours_per_leave_day: decimal("8"),
        overtime_multiplier: decimal("1.5"),
        allowances: vec![],
        statutory_deductions: vec![DeductionRule {
            name: "Income tax".to_string(),
            basis: DeductionBasis::Fixed {
                amount: decimal("400.00"),
            },
            cap: None,
        }],
        exchange_rates: vec![],
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
    inputs: HashMap<String, EmployeeInputs>,
}

impl StaticInputs {
    pub fn with(mut self, employee_id: &str, inputs: EmployeeInputs) -> Self {
        self.inputs.insert(employee_id.to_string(), inputs);
        self
    }
}

impl CompensationInputProvider for StaticInputs {
    fn employee_inputs(
        &self,
        employee_id: &str,
        _period: PayPeriod,
    ) -> EngineResult<EmployeeInputs> {
        self.inputs
            .get(employee_id)
            .cloned()
            .ok_or_else(|| EngineError::InputUnavailable {
                employee_id: employee_id.to_string(),
                message: "timesheet not submitted".to_string(),
            })
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
pub struct TextRenderer;

impl PayslipRenderer for TextRenderer {
    fn render(&self, record: &PayrollRecord, template_id: &str) -> EngineResult<Vec<u8>> {
        Ok(format!(
            "{} {} {} net {}",
            template_id, record.employee_id, record.period, record.net
        )
        .into_bytes())
    }
}

/// Every service wired over one shared state.
pub struct Engine {
    pub state: EngineState,
    pub clock: Arc<FixedClock>,
    pub audit_log: Arc<MemoryAuditLog>,
    pub notifier: Arc<RecordingNotifier>,
    pub calculator: PayrollCalculator,
    pub workflow: PayslipApprovalWorkflow,
    pub corrections: ErrorCorrectionManager,
}

impl Engine {
    pub fn new() -> Self {
        let config = ConfigLoader::load("./config/default").expect("Failed to load config");
        let clock = Arc::new(FixedClock::new(now()));
        let audit_log = Arc::new(MemoryAuditLog::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = EngineState::new(config, audit_log.clone(), clock.clone(), notifier.clone());
        Self {
            calculator: PayrollCalculator::new(state.clone()),
            workflow: PayslipApprovalWorkflow::new(state.clone(), Arc::new(TextRenderer)),
            corrections: ErrorCorrectionManager::new(state.clone()),
            state,
            clock,
            audit_log,
            notifier,
        }
    }

    pub fn processor(
        &self,
        directory: StaticDirectory,
        inputs: StaticInputs,
    ) -> BranchPayrollProcessor {
        BranchPayrollProcessor::new(self.state.clone(), Arc::new(directory), Arc::new(inputs))
    }
}
