//! Compensation inputs supplied by the attendance and leave subsystems.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A named amount supplied with the inputs (allowance override or voluntary
/// deduction), in the contract currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAmount {
    /// Component name.
    pub name: String,
    /// Amount in the contract currency.
    pub amount: Decimal,
}

impl NamedAmount {
    /// Creates a named amount.
    pub fn new(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// Everything the calculator needs to know about one employee for one period.
///
/// `worked_hours` is optional so that an attendance feed that has not
/// reported yet is distinguishable from a month with zero hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeInputs {
    /// Monthly base pay in the contract currency.
    pub base_monthly_pay: Decimal,
    /// The currency of the employment contract.
    pub contract_currency: String,
    /// Attendance-derived worked hours (may be zero).
    pub worked_hours: Option<Decimal>,
    /// Pre-approved overtime hours.
    #[serde(default)]
    pub overtime_hours: Decimal,
    /// Approved paid leave days, credited as hours worked.
    #[serde(default)]
    pub approved_leave_days: Decimal,
    /// Allowance amounts replacing (or adding to) the rule set's allowances.
    #[serde(default)]
    pub allowance_overrides: Vec<NamedAmount>,
    /// Voluntary deductions (loans, union fees, ...).
    #[serde(default)]
    pub voluntary_deductions: Vec<NamedAmount>,
}

impl EmployeeInputs {
    /// Creates inputs with base pay and worked hours only.
    pub fn new(
        base_monthly_pay: Decimal,
        contract_currency: impl Into<String>,
        worked_hours: Decimal,
    ) -> Self {
        Self {
            base_monthly_pay,
            contract_currency: contract_currency.into(),
            worked_hours: Some(worked_hours),
            overtime_hours: Decimal::ZERO,
            approved_leave_days: Decimal::ZERO,
            allowance_overrides: Vec::new(),
            voluntary_deductions: Vec::new(),
        }
    }
}
