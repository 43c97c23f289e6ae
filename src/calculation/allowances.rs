//! Allowance calculation.
//!
//! Allowances come from the rule set and are already denominated in the
//! record currency. Per-employee overrides from the inputs replace a rule
//! allowance of the same name or add a new one; override amounts are in the
//! contract currency and are converted.

use rust_decimal::Decimal;

use crate::config::RuleSet;
use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationStep, ComponentKind, EmployeeInputs, PayComponent};

use super::Conversion;

/// The result of calculating allowances.
#[derive(Debug, Clone)]
pub struct AllowancesResult {
    /// The allowance components with a non-zero amount, rule set order first.
    pub components: Vec<PayComponent>,
    /// The trace step recording this calculation.
    pub step: CalculationStep,
}

/// Calculates the allowances payable for the period.
///
/// # Errors
///
/// Returns `InvalidInput` when an override amount is negative.
pub fn calculate_allowances(
    inputs: &EmployeeInputs,
    rule_set: &RuleSet,
    conversion: &Conversion,
    step_number: u32,
) -> EngineResult<AllowancesResult> {
    if let Some(bad) = inputs
        .allowance_overrides
        .iter()
        .find(|o| o.amount < Decimal::ZERO)
    {
        return Err(EngineError::InvalidInput {
            field: format!("allowance_overrides.{}", bad.name),
            message: format!("must not be negative, got {}", bad.amount),
        });
    }

    let override_for = |name: &str| inputs.allowance_overrides.iter().find(|o| o.name == name);

    let mut components = Vec::new();
    let mut overridden = Vec::new();

    for rule in &rule_set.allowances {
        let amount = match override_for(&rule.name) {
            Some(o) => {
                overridden.push(rule.name.clone());
                conversion.convert(o.amount)
            }
            None => conversion.round(rule.amount),
        };
        if amount > Decimal::ZERO {
            components.push(PayComponent::new(&rule.name, ComponentKind::Allowance, amount));
        }
    }

    for extra in inputs
        .allowance_overrides
        .iter()
        .filter(|o| !rule_set.allowances.iter().any(|r| r.name == o.name))
    {
        let amount = conversion.convert(extra.amount);
        if amount > Decimal::ZERO {
            components.push(PayComponent::new(&extra.name, ComponentKind::Allowance, amount));
        }
    }

    let total: Decimal = components.iter().map(|c| c.amount).sum();

    let step = CalculationStep {
        step_number,
        rule_id: "allowances".to_string(),
        rule_name: "Allowances".to_string(),
        input: serde_json::json!({
            "rule_allowances": rule_set.allowances.iter().map(|a| &a.name).collect::<Vec<_>>(),
            "overrides": inputs.allowance_overrides.iter().map(|o| &o.name).collect::<Vec<_>>(),
        }),
        output: serde_json::json!({
            "components": components
                .iter()
                .map(|c| serde_json::json!({ "name": c.name, "amount": c.amount.to_string() }))
                .collect::<Vec<_>>(),
            "total": total.to_string(),
        }),
        reasoning: if overridden.is_empty() {
            format!("{} allowance(s) totalling {}", components.len(), total)
        } else {
            format!(
                "{} allowance(s) totalling {}; overridden: {}",
                components.len(),
                total,
                overridden.join(", ")
            )
        },
    };

    Ok(AllowancesResult { components, step })
}
