//! Applying a correction to a record's components.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationStep, ComponentKind, ComponentSide, CorrectionType, PayComponent, PayrollRecord,
};

/// Applies `change` to the components of `record` and re-derives its totals.
///
/// Amounts are rounded to the record currency's minor unit, so the
/// corrected record keeps `net = gross − Σ deductions` exactly. A
/// `CalculationStep` describing the change is appended to the trace.
///
/// # Errors
///
/// Returns `InvalidInput` when the change does not fit the record: the
/// component is missing (adjust, remove) or already present (add), a delta
/// is zero, or an amount would become negative. Net pay is not checked here.
pub fn apply_correction(record: &mut PayrollRecord, change: &CorrectionType) -> EngineResult<()> {
    let currency = record.currency.clone();
    let gross_before = record.gross;
    let net_before = record.net;

    let description = match change {
        CorrectionType::AmountAdjustment {
            component,
            side,
            delta,
        } => {
            let delta = currency.round(*delta);
            if delta.is_zero() {
                return Err(invalid("delta", "must not be zero"));
            }
            let slot = components_mut(record, *side)
                .iter_mut()
                .find(|c| &c.name == component)
                .ok_or_else(|| missing(component, *side))?;
            let amount = slot.amount + delta;
            if amount < Decimal::ZERO {
                return Err(invalid(
                    "delta",
                    &format!("'{}' would become negative ({})", component, amount),
                ));
            }
            slot.amount = amount;
            format!("{} {} adjusted by {}", side, component, delta)
        }
        CorrectionType::AddComponent {
            component,
            side,
            amount,
        } => {
            let amount = currency.round(*amount);
            if amount <= Decimal::ZERO {
                return Err(invalid("amount", "must be positive"));
            }
            let list = components_mut(record, *side);
            if list.iter().any(|c| &c.name == component) {
                return Err(invalid(
                    "component",
                    &format!("{} '{}' already exists", side, component),
                ));
            }
            list.push(PayComponent::new(
                component.clone(),
                ComponentKind::Adjustment,
                amount,
            ));
            format!("{} {} added at {}", side, component, amount)
        }
        CorrectionType::RemoveComponent { component, side } => {
            let list = components_mut(record, *side);
            let index = list
                .iter()
                .position(|c| &c.name == component)
                .ok_or_else(|| missing(component, *side))?;
            let removed = list.remove(index);
            format!("{} {} ({}) removed", side, component, removed.amount)
        }
    };

    record.recompute_totals();

    let step_number = record.trace.last().map(|s| s.step_number + 1).unwrap_or(1);
    record.trace.push(CalculationStep {
        step_number,
        rule_id: "error_correction".to_string(),
        rule_name: "Error Correction".to_string(),
        input: serde_json::json!({
            "change": change,
            "gross_before": gross_before.to_string(),
            "net_before": net_before.to_string(),
        }),
        output: serde_json::json!({
            "gross": record.gross.to_string(),
            "net": record.net.to_string(),
        }),
        reasoning: description,
    });

    Ok(())
}

fn components_mut(record: &mut PayrollRecord, side: ComponentSide) -> &mut Vec<PayComponent> {
    match side {
        ComponentSide::Earning => &mut record.earnings,
        ComponentSide::Deduction => &mut record.deductions,
    }
}

fn invalid(field: &str, message: &str) -> EngineError {
    EngineError::InvalidInput {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn missing(component: &str, side: ComponentSide) -> EngineError {
    invalid(
        "component",
        &format!("{} '{}' does not exist on the record", side, component),
    )
}
