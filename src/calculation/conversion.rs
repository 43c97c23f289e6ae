//! Contract-currency conversion.
//!
//! Salary inputs are denominated in the employee's contract currency while
//! records are kept in the branch currency of the rule set. The rate is
//! taken from the rule set and snapshotted onto the record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::RuleSet;
use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationStep, Currency, ExchangeRateSnapshot};

/// The conversion applied to every input amount of one calculation.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Multiplier from contract currency to record currency.
    pub rate: Decimal,
    /// The record currency.
    pub currency: Currency,
    /// The snapshot stored on the record, `None` when no conversion applies.
    pub snapshot: Option<ExchangeRateSnapshot>,
}

impl Conversion {
    /// The identity conversion into `currency`.
    pub fn identity(currency: Currency) -> Self {
        Self {
            rate: Decimal::ONE,
            currency,
            snapshot: None,
        }
    }

    /// Converts a contract-currency amount and rounds it to the minor unit.
    pub fn convert(&self, amount: Decimal) -> Decimal {
        self.currency.round(amount * self.rate)
    }

    /// Rounds an amount that is already in the record currency.
    pub fn round(&self, amount: Decimal) -> Decimal {
        self.currency.round(amount)
    }
}

/// The result of resolving the conversion for a calculation.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// The conversion to apply.
    pub conversion: Conversion,
    /// The trace step recording the decision.
    pub step: CalculationStep,
}

/// Resolves the conversion from `contract_currency` into the rule set currency.
///
/// Fails with `InvalidRuleConfiguration` when the currencies differ and the
/// rule set carries no rate for the contract currency.
pub fn resolve_conversion(
    contract_currency: &str,
    rule_set: &RuleSet,
    captured_at: DateTime<Utc>,
    step_number: u32,
) -> EngineResult<ConversionResult> {
    let target = &rule_set.currency;

    if contract_currency == target.code {
        let step = CalculationStep {
            step_number,
            rule_id: "currency_conversion".to_string(),
            rule_name: "Currency Conversion".to_string(),
            input: serde_json::json!({
                "contract_currency": contract_currency,
                "record_currency": target.code,
            }),
            output: serde_json::json!({ "rate": "1" }),
            reasoning: format!("Contract currency matches {}; no conversion", target.code),
        };
        return Ok(ConversionResult {
            conversion: Conversion::identity(target.clone()),
            step,
        });
    }

    let rate = rule_set
        .exchange_rate_from(contract_currency)
        .ok_or_else(|| EngineError::InvalidRuleConfiguration {
            rule_set: rule_set.id.clone(),
            message: format!(
                "no exchange rate from {} to {}",
                contract_currency, target.code
            ),
        })?;

    let snapshot = ExchangeRateSnapshot {
        from: contract_currency.to_string(),
        to: target.code.clone(),
        rate,
        captured_at,
    };

    let step = CalculationStep {
        step_number,
        rule_id: "currency_conversion".to_string(),
        rule_name: "Currency Conversion".to_string(),
        input: serde_json::json!({
            "contract_currency": contract_currency,
            "record_currency": target.code,
        }),
        output: serde_json::json!({ "rate": rate.normalize().to_string() }),
        reasoning: format!(
            "1 {} = {} {} (rule set {} v{})",
            contract_currency,
            rate.normalize(),
            target.code,
            rule_set.id,
            rule_set.version
        ),
    };

    Ok(ConversionResult {
        conversion: Conversion {
            rate,
            currency: target.clone(),
            snapshot: Some(snapshot),
        },
        step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::usd_rule_set;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 5, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_same_currency_is_identity() {
        let result = resolve_conversion("USD", &usd_rule_set(), at(), 1).unwrap();
        assert_eq!(result.conversion.rate, Decimal::ONE);
        assert!(result.conversion.snapshot.is_none());
        assert_eq!(result.conversion.convert(dec("10.005")), dec("10.01"));
    }

    #[test]
    fn test_foreign_currency_is_snapshotted() {
        let result = resolve_conversion("EUR", &usd_rule_set(), at(), 1).unwrap();
        let snapshot = result.conversion.snapshot.clone().unwrap();
        assert_eq!(snapshot.from, "EUR");
        assert_eq!(snapshot.to, "USD");
        assert_eq!(snapshot.rate, dec("1.08"));
        assert_eq!(snapshot.captured_at, at());
        assert_eq!(result.conversion.convert(dec("100")), dec("108.00"));
    }

    #[test]
    fn test_unknown_currency_is_rule_error() {
        match resolve_conversion("GBP", &usd_rule_set(), at(), 1) {
            Err(EngineError::InvalidRuleConfiguration { message, .. }) => {
                assert!(message.contains("GBP"));
            }
            other => panic!("Expected InvalidRuleConfiguration, got {:?}", other),
        }
    }
}
