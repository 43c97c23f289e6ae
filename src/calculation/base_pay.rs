//! Base pay calculation.
//!
//! Monthly base pay is pro-rated by the hours actually paid: worked hours
//! plus approved leave credited at the rule set's hours per leave day,
//! capped at the standard monthly hours.

use rust_decimal::Decimal;

use crate::config::RuleSet;
use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationStep, ComponentKind, EmployeeInputs, PayComponent};

use super::Conversion;

/// The earning name used for base pay.
pub const BASE_PAY_COMPONENT: &str = "Base pay";

/// The result of calculating base pay, including the component and trace step.
#[derive(Debug, Clone)]
pub struct BasePayResult {
    /// The base pay component, `None` when nothing is payable.
    pub component: Option<PayComponent>,
    /// Hours counted toward base pay after the standard-hours cap.
    pub paid_hours: Decimal,
    /// The trace step recording this calculation.
    pub step: CalculationStep,
}

/// Calculates pro-rated base pay.
///
/// # Arguments
///
/// * `employee_id` - The employee being paid, used in error reports
/// * `inputs` - The employee's compensation inputs for the period
/// * `rule_set` - The rule set supplying standard hours and leave credit
/// * `conversion` - The conversion from contract to record currency
/// * `step_number` - The step number for trace sequencing
///
/// # Errors
///
/// * `MissingInputData` when worked hours were not supplied
/// * `InvalidInput` when hours, leave days or base pay are negative
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::{Conversion, calculate_base_pay};
/// use payroll_engine::config::RuleSet;
/// use payroll_engine::models::{Currency, EmployeeInputs};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let rule_set: RuleSet = serde_yaml::from_str(r#"
/// id: standard_usd
/// version: 1
/// jurisdiction: us_default
/// currency: { code: USD, minor_units: 2 }
/// standard_monthly_hours: "160"
/// hours_per_leave_day: "8"
/// overtime_multiplier: "1.5"
/// "#).unwrap();
///
/// let mut inputs = EmployeeInputs::new(Decimal::from(4000), "USD", Decimal::from(144));
/// inputs.approved_leave_days = Decimal::from(1);
///
/// let conversion = Conversion::identity(Currency::new("USD", 2));
/// let result = calculate_base_pay("emp_001", &inputs, &rule_set, &conversion, 1).unwrap();
///
/// // 144 worked + 8 leave = 152 of 160 hours
/// assert_eq!(result.paid_hours, Decimal::from(152));
/// assert_eq!(result.component.unwrap().amount, Decimal::from_str("3800.00").unwrap());
/// ```
pub fn calculate_base_pay(
    employee_id: &str,
    inputs: &EmployeeInputs,
    rule_set: &RuleSet,
    conversion: &Conversion,
    step_number: u32,
) -> EngineResult<BasePayResult> {
    let worked_hours = inputs
        .worked_hours
        .ok_or_else(|| EngineError::MissingInputData {
            employee_id: employee_id.to_string(),
            field: "worked_hours".to_string(),
        })?;

    ensure_non_negative("worked_hours", worked_hours)?;
    ensure_non_negative("approved_leave_days", inputs.approved_leave_days)?;
    ensure_non_negative("base_monthly_pay", inputs.base_monthly_pay)?;

    let standard_hours = rule_set.standard_monthly_hours;
    let leave_hours = inputs.approved_leave_days * rule_set.hours_per_leave_day;
    let paid_hours = (worked_hours + leave_hours).min(standard_hours);

    // Multiply before dividing so exact fractions stay exact.
    let contract_amount = inputs.base_monthly_pay * paid_hours / standard_hours;
    let amount = conversion.convert(contract_amount);

    let step = CalculationStep {
        step_number,
        rule_id: "base_pay".to_string(),
        rule_name: "Base Pay".to_string(),
        input: serde_json::json!({
            "base_monthly_pay": inputs.base_monthly_pay.to_string(),
            "worked_hours": worked_hours.to_string(),
            "approved_leave_days": inputs.approved_leave_days.to_string(),
            "hours_per_leave_day": rule_set.hours_per_leave_day.to_string(),
            "standard_monthly_hours": standard_hours.to_string(),
        }),
        output: serde_json::json!({
            "paid_hours": paid_hours.to_string(),
            "amount": amount.to_string(),
        }),
        reasoning: format!(
            "{} × min({} worked + {} leave, {}) / {} = {} {}",
            inputs.base_monthly_pay.normalize(),
            worked_hours.normalize(),
            leave_hours.normalize(),
            standard_hours.normalize(),
            standard_hours.normalize(),
            amount,
            conversion.currency.code
        ),
    };

    let component = (amount > Decimal::ZERO)
        .then(|| PayComponent::new(BASE_PAY_COMPONENT, ComponentKind::BasePay, amount));

    Ok(BasePayResult {
        component,
        paid_hours,
        step,
    })
}

pub(crate) fn ensure_non_negative(field: &str, value: Decimal) -> EngineResult<()> {
    if value < Decimal::ZERO {
        return Err(EngineError::InvalidInput {
            field: field.to_string(),
            message: format!("must not be negative, got {}", value),
        });
    }
    Ok(())
}
