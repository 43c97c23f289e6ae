//! Calculation logic for the Payroll Engine.
//!
//! This module contains the pay rules applied to one employee for one
//! period: contract-currency conversion, pro-rated base pay, overtime,
//! allowances, statutory and voluntary deductions, and the calculator that
//! combines them and persists the result.

mod allowances;
mod base_pay;
mod calculator;
mod conversion;
mod deductions;
mod overtime;

pub use allowances::{AllowancesResult, calculate_allowances};
pub use base_pay::{BASE_PAY_COMPONENT, BasePayResult, calculate_base_pay};
pub use calculator::{PayCalculation, PayrollCalculator, calculate_pay};
pub use conversion::{Conversion, ConversionResult, resolve_conversion};
pub use deductions::{
    DeductionsResult, calculate_statutory_deductions, calculate_voluntary_deductions,
};
pub use overtime::{OVERTIME_COMPONENT, OvertimeResult, calculate_overtime};

pub(crate) use calculator::amounts_payload;
