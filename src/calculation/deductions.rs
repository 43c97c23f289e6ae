//! Statutory and voluntary deductions.

use rust_decimal::Decimal;

use crate::config::{DeductionBasis, RuleSet};
use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationStep, ComponentKind, EmployeeInputs, PayComponent};

use super::Conversion;

/// The result of calculating one group of deductions.
#[derive(Debug, Clone)]
pub struct DeductionsResult {
    /// The deduction components with a non-zero amount.
    pub components: Vec<PayComponent>,
    /// The trace step recording this calculation.
    pub step: CalculationStep,
}

/// Applies the rule set's statutory deductions to a (rounded) gross amount.
///
/// Fixed deductions are taken as configured. Percentage deductions are
/// computed on `gross`, rounded to the minor unit and then capped.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::{Conversion, calculate_statutory_deductions};
/// use payroll_engine::config::RuleSet;
/// use payroll_engine::models::Currency;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let rule_set: RuleSet = serde_yaml::from_str(r#"
/// id: standard_usd
/// version: 1
/// jurisdiction: us_default
/// currency: { code: USD }
/// standard_monthly_hours: "160"
/// hours_per_leave_day: "8"
/// overtime_multiplier: "1.5"
/// statutory_deductions:
///   - name: Social security
///     basis: { type: percent_of_gross, rate: "0.062" }
///     cap: "500.00"
/// "#).unwrap();
///
/// let conversion = Conversion::identity(Currency::new("USD", 2));
/// let result = calculate_statutory_deductions(
///     Decimal::from_str("4150.00").unwrap(),
///     &rule_set,
///     &conversion,
///     5,
/// );
///
/// assert_eq!(result.components[0].amount, Decimal::from_str("257.30").unwrap());
/// ```
pub fn calculate_statutory_deductions(
    gross: Decimal,
    rule_set: &RuleSet,
    conversion: &Conversion,
    step_number: u32,
) -> DeductionsResult {
    let mut components = Vec::new();
    let mut lines = Vec::new();

    for rule in &rule_set.statutory_deductions {
        let computed = match rule.basis {
            DeductionBasis::Fixed { amount } => conversion.round(amount),
            DeductionBasis::PercentOfGross { rate } => conversion.round(gross * rate),
        };
        let amount = match rule.cap {
            Some(cap) if computed > cap => {
                lines.push(format!("{} {} (capped from {})", rule.name, cap, computed));
                conversion.round(cap)
            }
            _ => {
                lines.push(format!("{} {}", rule.name, computed));
                computed
            }
        };
        if amount > Decimal::ZERO {
            components.push(PayComponent::new(
                &rule.name,
                ComponentKind::StatutoryDeduction,
                amount,
            ));
        }
    }

    let total: Decimal = components.iter().map(|c| c.amount).sum();

    let step = CalculationStep {
        step_number,
        rule_id: "statutory_deductions".to_string(),
        rule_name: "Statutory Deductions".to_string(),
        input: serde_json::json!({
            "gross": gross.to_string(),
            "jurisdiction": rule_set.jurisdiction,
        }),
        output: serde_json::json!({ "total": total.to_string() }),
        reasoning: if lines.is_empty() {
            "No statutory deductions configured".to_string()
        } else {
            lines.join("; ")
        },
    };

    DeductionsResult { components, step }
}

/// Converts the voluntary deductions supplied with the inputs.
///
/// # Errors
///
/// Returns `InvalidInput` when a voluntary deduction is negative.
pub fn calculate_voluntary_deductions(
    inputs: &EmployeeInputs,
    conversion: &Conversion,
    step_number: u32,
) -> EngineResult<DeductionsResult> {
    let mut components = Vec::with_capacity(inputs.voluntary_deductions.len());
    for deduction in &inputs.voluntary_deductions {
        if deduction.amount < Decimal::ZERO {
            return Err(EngineError::InvalidInput {
                field: format!("voluntary_deductions.{}", deduction.name),
                message: format!("must not be negative, got {}", deduction.amount),
            });
        }
        let amount = conversion.convert(deduction.amount);
        if amount > Decimal::ZERO {
            components.push(PayComponent::new(
                &deduction.name,
                ComponentKind::VoluntaryDeduction,
                amount,
            ));
        }
    }

    let total: Decimal = components.iter().map(|c| c.amount).sum();
    let step = CalculationStep {
        step_number,
        rule_id: "voluntary_deductions".to_string(),
        rule_name: "Voluntary Deductions".to_string(),
        input: serde_json::json!({
            "requested": inputs.voluntary_deductions.len(),
        }),
        output: serde_json::json!({ "total": total.to_string() }),
        reasoning: format!("{} voluntary deduction(s) totalling {}", components.len(), total),
    };

    Ok(DeductionsResult { components, step })
}
