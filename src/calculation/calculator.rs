//! Payroll calculation for one employee and period.
//!
//! [`calculate_pay`] is the pure core: inputs and a rule set in, components
//! and totals out. [`PayrollCalculator`] wraps it with the record lifecycle,
//! persisting the result as the head of the employee's version chain.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::audit::Transition;
use crate::config::RuleSet;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Actor, CalculationStep, Currency, EmployeeInputs, ExchangeRateSnapshot, PayComponent,
    PayPeriod, PayrollEvent, PayrollKey, PayrollRecord, RecordStatus, RuleSetRef, SubjectType,
};
use crate::state::EngineState;

use super::{
    ConversionResult, calculate_allowances, calculate_base_pay, calculate_overtime,
    calculate_statutory_deductions, calculate_voluntary_deductions, resolve_conversion,
};

/// The outcome of a pure pay calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayCalculation {
    /// Earning components in calculation order.
    pub earnings: Vec<PayComponent>,
    /// Deduction components in calculation order.
    pub deductions: Vec<PayComponent>,
    /// Sum of earnings.
    pub gross: Decimal,
    /// Gross less deductions; never negative.
    pub net: Decimal,
    /// The record currency.
    pub currency: Currency,
    /// The exchange rate applied, if any.
    pub exchange_rate: Option<ExchangeRateSnapshot>,
    /// The rule set used.
    pub rule_set: RuleSetRef,
    /// The calculation trace.
    pub trace: Vec<CalculationStep>,
}

impl PayCalculation {
    /// Returns the sum of all deductions.
    pub fn total_deductions(&self) -> Decimal {
        self.deductions.iter().map(|d| d.amount).sum()
    }

    fn apply_to(self, record: &mut PayrollRecord) {
        record.earnings = self.earnings;
        record.deductions = self.deductions;
        record.gross = self.gross;
        record.net = self.net;
        record.currency = self.currency;
        record.exchange_rate = self.exchange_rate;
        record.rule_set = Some(self.rule_set);
        record.trace = self.trace;
    }
}

/// Calculates gross and net pay for one employee and period.
///
/// The period must be closed on `calculated_at`. Every component is
/// converted into the rule set currency and rounded to its minor unit
/// before totals are taken, so `net = gross − Σ deductions` holds exactly.
///
/// # Errors
///
/// * `InvalidPeriod` when the period has not ended
/// * `InvalidRuleConfiguration` when the rule set is inconsistent or lacks
///   an exchange rate for the contract currency
/// * `MissingInputData` / `InvalidInput` for absent or malformed inputs
/// * `NegativeNetPay` when deductions exceed gross
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use payroll_engine::calculation::calculate_pay;
/// use payroll_engine::config::ConfigLoader;
/// use payroll_engine::models::{EmployeeInputs, PayPeriod};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let config = ConfigLoader::load("./config/default").unwrap();
/// let rule_set = config.rule_set("standard_usd").unwrap();
/// let inputs = EmployeeInputs::new(Decimal::from(4000), "USD", Decimal::from(160));
///
/// let result = calculate_pay(
///     "emp_001",
///     PayPeriod::new(2026, 1).unwrap(),
///     &inputs,
///     &rule_set,
///     Utc.with_ymd_and_hms(2026, 2, 5, 9, 0, 0).unwrap(),
/// )
/// .unwrap();
///
/// assert_eq!(result.gross, Decimal::from_str("4150.00").unwrap());
/// assert_eq!(result.net, Decimal::from_str("3772.70").unwrap());
/// ```
pub fn calculate_pay(
    employee_id: &str,
    period: PayPeriod,
    inputs: &EmployeeInputs,
    rule_set: &RuleSet,
    calculated_at: DateTime<Utc>,
) -> EngineResult<PayCalculation> {
    period.ensure_closed(calculated_at.date_naive())?;
    rule_set.validate()?;

    let mut trace = Vec::new();

    let ConversionResult { conversion, step } =
        resolve_conversion(&inputs.contract_currency, rule_set, calculated_at, 1)?;
    trace.push(step);

    let base = calculate_base_pay(employee_id, inputs, rule_set, &conversion, 2)?;
    trace.push(base.step);
    let overtime = calculate_overtime(inputs, rule_set, &conversion, 3)?;
    trace.push(overtime.step);
    let allowances = calculate_allowances(inputs, rule_set, &conversion, 4)?;
    trace.push(allowances.step);

    let mut earnings = Vec::new();
    earnings.extend(base.component);
    earnings.extend(overtime.component);
    earnings.extend(allowances.components);
    ensure_unique_names("earnings", &earnings)?;
    let gross: Decimal = earnings.iter().map(|e| e.amount).sum();

    let statutory = calculate_statutory_deductions(gross, rule_set, &conversion, 5);
    trace.push(statutory.step);
    let voluntary = calculate_voluntary_deductions(inputs, &conversion, 6)?;
    trace.push(voluntary.step);

    let mut deductions = statutory.components;
    deductions.extend(voluntary.components);
    ensure_unique_names("deductions", &deductions)?;
    let total_deductions: Decimal = deductions.iter().map(|d| d.amount).sum();
    let net = gross - total_deductions;

    trace.push(CalculationStep {
        step_number: 7,
        rule_id: "net_pay".to_string(),
        rule_name: "Net Pay".to_string(),
        input: serde_json::json!({
            "gross": gross.to_string(),
            "total_deductions": total_deductions.to_string(),
        }),
        output: serde_json::json!({ "net": net.to_string() }),
        reasoning: format!(
            "{} − {} = {} {}",
            gross, total_deductions, net, conversion.currency.code
        ),
    });

    if net < Decimal::ZERO {
        warn!(
            employee_id = %employee_id,
            period = %period,
            gross = %gross,
            deductions = %total_deductions,
            "Deductions exceed gross pay"
        );
        return Err(EngineError::NegativeNetPay {
            employee_id: employee_id.to_string(),
            net,
        });
    }

    Ok(PayCalculation {
        earnings,
        deductions,
        gross,
        net,
        currency: conversion.currency,
        exchange_rate: conversion.snapshot,
        rule_set: rule_set.reference(),
        trace,
    })
}

fn ensure_unique_names(list: &str, components: &[PayComponent]) -> EngineResult<()> {
    let mut seen = HashSet::new();
    for component in components {
        if !seen.insert(component.name.as_str()) {
            return Err(EngineError::InvalidInput {
                field: list.to_string(),
                message: format!("duplicate component '{}'", component.name),
            });
        }
    }
    Ok(())
}

/// The amounts of a record as recorded in audit payloads.
pub(crate) fn amounts_payload(record: &PayrollRecord) -> serde_json::Value {
    serde_json::json!({
        "gross": record.gross.to_string(),
        "net": record.net.to_string(),
        "currency": record.currency.code,
        "earnings": record.earnings,
        "deductions": record.deductions,
        "rule_set": record.rule_set,
        "exchange_rate": record.exchange_rate,
    })
}

/// Calculates and persists payroll records.
///
/// The first calculation for an `(employee, period)` creates a version-1
/// record; later calculations overwrite it in place while it is still
/// `Draft` or `Calculated`. Once a record has entered approval it cannot be
/// recalculated, and once released it only changes through a correction.
#[derive(Clone)]
pub struct PayrollCalculator {
    state: EngineState,
}

impl PayrollCalculator {
    /// Creates a calculator over the shared engine state.
    pub fn new(state: EngineState) -> Self {
        Self { state }
    }

    /// Calculates with the rule set configured for `branch_id`.
    pub fn calculate_for_branch(
        &self,
        employee_id: &str,
        branch_id: &str,
        period: PayPeriod,
        inputs: &EmployeeInputs,
        actor: &Actor,
    ) -> EngineResult<PayrollRecord> {
        let rule_set = self.state.config().rule_set_for_branch(branch_id)?;
        self.calculate(employee_id, branch_id, period, inputs, &rule_set, actor)
    }

    /// Calculates one employee's pay and stores it as a `Calculated` record.
    ///
    /// Nothing is written when the calculation fails.
    pub fn calculate(
        &self,
        employee_id: &str,
        branch_id: &str,
        period: PayPeriod,
        inputs: &EmployeeInputs,
        rule_set: &RuleSet,
        actor: &Actor,
    ) -> EngineResult<PayrollRecord> {
        let key = PayrollKey::new(employee_id, period);
        let _lease = self.state.record_leases().acquire(key.clone())?;

        let existing = self.state.store().head(&key);
        if let Some(record) = &existing {
            ensure_recalculable(record)?;
        }

        let now = self.state.clock().now();
        let calculation = calculate_pay(employee_id, period, inputs, rule_set, now)
            .inspect_err(|err| {
                warn!(
                    employee_id = %employee_id,
                    period = %period,
                    error = %err,
                    "Calculation failed"
                );
            })?;

        let is_new = existing.is_none();
        let mut transitions = Vec::with_capacity(2);
        let mut record = match existing {
            Some(record) => record,
            None => {
                let draft = PayrollRecord::draft(
                    employee_id,
                    branch_id,
                    period,
                    calculation.currency.clone(),
                );
                transitions.push(Transition::created(
                    SubjectType::PayrollRecord,
                    draft.reference().to_string(),
                    draft.status,
                    serde_json::json!({
                        "employee_id": employee_id,
                        "branch_id": branch_id,
                        "period": period.to_string(),
                    }),
                ));
                draft
            }
        };

        let from_status = record.status;
        record.branch_id = branch_id.to_string();
        calculation.apply_to(&mut record);
        record.status = RecordStatus::Calculated;
        record.calculated_at = Some(now);
        record.calculated_by = Some(actor.id.clone());

        transitions.push(Transition::changed(
            SubjectType::PayrollRecord,
            record.reference().to_string(),
            from_status,
            record.status,
            amounts_payload(&record),
        ));
        self.state.audit().record_all(&actor.id, transitions)?;

        let stored = record.clone();
        self.state.store().write(|data| {
            if is_new {
                data.insert_head(stored);
                Ok(())
            } else {
                data.replace(stored)
            }
        })?;

        info!(
            employee_id = %employee_id,
            period = %period,
            record = %record.reference(),
            gross = %record.gross,
            net = %record.net,
            recalculated = !is_new,
            "Payroll calculated"
        );

        self.state.notifier().notify(PayrollEvent::RecordCalculated {
            record: record.reference(),
            employee_id: employee_id.to_string(),
        });

        Ok(record)
    }
}

fn ensure_recalculable(record: &PayrollRecord) -> EngineResult<()> {
    match record.status {
        RecordStatus::Draft | RecordStatus::Calculated => Ok(()),
        RecordStatus::PendingApproval { .. } | RecordStatus::Approved => {
            debug!(record = %record.reference(), status = %record.status, "Recalculation refused");
            Err(EngineError::InvalidState {
                subject: record.reference().to_string(),
                expected: "draft or calculated".to_string(),
                actual: record.status.to_string(),
            })
        }
        RecordStatus::Released | RecordStatus::Corrected => Err(EngineError::RequiresCorrection {
            record: record.reference().to_string(),
            status: record.status.to_string(),
        }),
    }
}
