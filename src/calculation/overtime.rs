//! Overtime pay calculation.

use rust_decimal::Decimal;

use crate::config::RuleSet;
use crate::error::EngineResult;
use crate::models::{CalculationStep, ComponentKind, EmployeeInputs, PayComponent};

use super::Conversion;
use super::base_pay::ensure_non_negative;

/// The earning name used for overtime.
pub const OVERTIME_COMPONENT: &str = "Overtime";

/// The result of calculating overtime pay.
#[derive(Debug, Clone)]
pub struct OvertimeResult {
    /// The overtime component, `None` when no overtime was worked.
    pub component: Option<PayComponent>,
    /// The trace step recording this calculation.
    pub step: CalculationStep,
}

/// Calculates overtime pay at the rule set's multiplier.
///
/// The hourly rate is derived from the monthly base over the standard
/// monthly hours: `overtime_hours × base / standard_hours × multiplier`.
///
/// # Errors
///
/// Returns `InvalidInput` when the overtime hours are negative.
pub fn calculate_overtime(
    inputs: &EmployeeInputs,
    rule_set: &RuleSet,
    conversion: &Conversion,
    step_number: u32,
) -> EngineResult<OvertimeResult> {
    ensure_non_negative("overtime_hours", inputs.overtime_hours)?;

    let hours = inputs.overtime_hours;
    let multiplier = rule_set.overtime_multiplier;
    let contract_amount =
        hours * inputs.base_monthly_pay * multiplier / rule_set.standard_monthly_hours;
    let amount = conversion.convert(contract_amount);

    let reasoning = if hours.is_zero() {
        "No overtime hours recorded".to_string()
    } else {
        format!(
            "{}h × ({} / {}h) × {} = {} {}",
            hours.normalize(),
            inputs.base_monthly_pay.normalize(),
            rule_set.standard_monthly_hours.normalize(),
            multiplier.normalize(),
            amount,
            conversion.currency.code
        )
    };

    let step = CalculationStep {
        step_number,
        rule_id: "overtime".to_string(),
        rule_name: "Overtime".to_string(),
        input: serde_json::json!({
            "overtime_hours": hours.to_string(),
            "base_monthly_pay": inputs.base_monthly_pay.to_string(),
            "multiplier": multiplier.to_string(),
        }),
        output: serde_json::json!({ "amount": amount.to_string() }),
        reasoning,
    };

    let component = (amount > Decimal::ZERO)
        .then(|| PayComponent::new(OVERTIME_COMPONENT, ComponentKind::Overtime, amount));

    Ok(OvertimeResult { component, step })
}
