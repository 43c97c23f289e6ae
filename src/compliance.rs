//! Statutory compliance checks.
//!
//! Checks are advisory: they report violations of the jurisdiction's
//! thresholds but never block a calculation or release.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{ComplianceRules, ConfigLoader};
use crate::error::EngineResult;
use crate::models::{ComponentKind, PayrollRecord};

/// The threshold a violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceRule {
    /// Net pay must reach a minimum.
    MinimumNetPay,
    /// Total deductions must not exceed an absolute amount.
    MaxTotalDeductions,
    /// Deductions must not exceed a share of gross.
    MaxDeductionRatio,
    /// Overtime must not exceed a share of gross.
    MaxOvertimeRatio,
}

impl fmt::Display for ComplianceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComplianceRule::MinimumNetPay => "minimum_net_pay",
            ComplianceRule::MaxTotalDeductions => "max_total_deductions",
            ComplianceRule::MaxDeductionRatio => "max_deduction_ratio",
            ComplianceRule::MaxOvertimeRatio => "max_overtime_ratio",
        };
        f.write_str(name)
    }
}

/// One threshold a record falls outside of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    /// The rule violated.
    pub rule: ComplianceRule,
    /// The value found on the record.
    pub actual: Decimal,
    /// The configured limit.
    pub limit: Decimal,
}

impl fmt::Display for ComplianceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rule {
            ComplianceRule::MinimumNetPay => {
                write!(f, "net pay {} is below the minimum {}", self.actual, self.limit)
            }
            _ => write!(f, "{} {} exceeds the limit {}", self.rule, self.actual, self.limit),
        }
    }
}

/// Checks a record against a set of thresholds.
///
/// Ratios are computed against gross and rounded to four decimal places;
/// ratio rules are skipped when gross is zero.
///
/// # Example
///
/// ```
/// use payroll_engine::compliance::{ComplianceRule, validate};
/// use payroll_engine::config::ComplianceRules;
/// use payroll_engine::models::{ComponentKind, Currency, PayComponent, PayPeriod, PayrollRecord};
/// use rust_decimal::Decimal;
///
/// let mut record = PayrollRecord::draft(
///     "emp_001",
///     "branch_north",
///     PayPeriod::new(2026, 1).unwrap(),
///     Currency::new("USD", 2),
/// );
/// record.earnings = vec![PayComponent::new(
///     "Base pay",
///     ComponentKind::BasePay,
///     Decimal::from(1000),
/// )];
/// record.recompute_totals();
///
/// let rules = ComplianceRules {
///     minimum_net_pay: Some(Decimal::from(1200)),
///     ..ComplianceRules::default()
/// };
///
/// let violations = validate(&record, &rules);
/// assert_eq!(violations.len(), 1);
/// assert_eq!(violations[0].rule, ComplianceRule::MinimumNetPay);
/// ```
pub fn validate(record: &PayrollRecord, rules: &ComplianceRules) -> Vec<ComplianceViolation> {
    let mut violations = Vec::new();
    let total_deductions = record.total_deductions();

    if let Some(minimum) = rules.minimum_net_pay {
        if record.net < minimum {
            violations.push(ComplianceViolation {
                rule: ComplianceRule::MinimumNetPay,
                actual: record.net,
                limit: minimum,
            });
        }
    }

    if let Some(max) = rules.max_total_deductions {
        if total_deductions > max {
            violations.push(ComplianceViolation {
                rule: ComplianceRule::MaxTotalDeductions,
                actual: total_deductions,
                limit: max,
            });
        }
    }

    if record.gross > Decimal::ZERO {
        if let Some(max) = rules.max_deduction_ratio {
            let ratio = (total_deductions / record.gross).round_dp(4);
            if ratio > max {
                violations.push(ComplianceViolation {
                    rule: ComplianceRule::MaxDeductionRatio,
                    actual: ratio,
                    limit: max,
                });
            }
        }

        if let Some(max) = rules.max_overtime_ratio {
            let overtime: Decimal = record
                .earnings
                .iter()
                .filter(|e| e.kind == ComponentKind::Overtime)
                .map(|e| e.amount)
                .sum();
            let ratio = (overtime / record.gross).round_dp(4);
            if ratio > max {
                violations.push(ComplianceViolation {
                    rule: ComplianceRule::MaxOvertimeRatio,
                    actual: ratio,
                    limit: max,
                });
            }
        }
    }

    violations
}

/// Looks up the thresholds for a record's jurisdiction and checks it.
#[derive(Debug, Clone, Copy)]
pub struct ComplianceValidator<'a> {
    config: &'a ConfigLoader,
}

impl<'a> ComplianceValidator<'a> {
    /// Creates a validator over the loaded configuration.
    pub fn new(config: &'a ConfigLoader) -> Self {
        Self { config }
    }

    /// Checks `record` against the rules of the jurisdiction of the rule
    /// set it was calculated with. Records without a rule set, or whose
    /// jurisdiction has no rules, have no violations.
    pub fn check(&self, record: &PayrollRecord) -> EngineResult<Vec<ComplianceViolation>> {
        let Some(rule_set_ref) = &record.rule_set else {
            return Ok(Vec::new());
        };
        let rule_set = self.config.rule_set(&rule_set_ref.id)?;
        let Some(rules) = self.config.compliance_rules(&rule_set.jurisdiction) else {
            return Ok(Vec::new());
        };

        let violations = validate(record, rules);
        for violation in &violations {
            tracing::warn!(
                employee_id = %record.employee_id,
                record = %record.reference(),
                jurisdiction = %rule_set.jurisdiction,
                rule = %violation.rule,
                "Compliance violation: {}",
                violation
            );
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, PayComponent, PayPeriod, RuleSetRef};
    use crate::test_support::{dec, test_config};

    fn record(
        earnings: &[(&str, ComponentKind, &str)],
        deductions: &[(&str, &str)],
    ) -> PayrollRecord {
        let mut record = PayrollRecord::draft(
            "emp_001",
            "branch_north",
            PayPeriod::new(2026, 1).unwrap(),
            Currency::new("USD", 2),
        );
        record.earnings = earnings
            .iter()
            .map(|(name, kind, amount)| PayComponent::new(*name, *kind, dec(amount)))
            .collect();
        record.deductions = deductions
            .iter()
            .map(|(name, amount)| {
                PayComponent::new(*name, ComponentKind::StatutoryDeduction, dec(amount))
            })
            .collect();
        record.recompute_totals();
        record
    }

    fn us_rules() -> ComplianceRules {
        ComplianceRules {
            minimum_net_pay: Some(dec("1200.00")),
            max_total_deductions: Some(dec("2000.00")),
            max_deduction_ratio: Some(dec("0.50")),
            max_overtime_ratio: Some(dec("0.40")),
        }
    }

    #[test]
    fn test_compliant_record_has_no_violations() {
        let record = record(
            &[("Base pay", ComponentKind::BasePay, "4000.00")],
            &[("Tax", "800.00")],
        );
        assert!(validate(&record, &us_rules()).is_empty());
    }

    #[test]
    fn test_low_net_pay_is_reported() {
        let record = record(
            &[("Base pay", ComponentKind::BasePay, "1300.00")],
            &[("Tax", "200.00")],
        );
        let violations = validate(&record, &us_rules());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, ComplianceRule::MinimumNetPay);
        assert_eq!(violations[0].actual, dec("1100.00"));
        assert_eq!(
            violations[0].to_string(),
            "net pay 1100.00 is below the minimum 1200.00"
        );
    }

    #[test]
    fn test_deduction_limits_are_reported() {
        let record = record(
            &[("Base pay", ComponentKind::BasePay, "5000.00")],
            &[("Tax", "2600.00")],
        );
        let rules: Vec<ComplianceRule> = validate(&record, &us_rules())
            .into_iter()
            .map(|v| v.rule)
            .collect();
        assert_eq!(
            rules,
            vec![
                ComplianceRule::MaxTotalDeductions,
                ComplianceRule::MaxDeductionRatio
            ]
        );
    }

    #[test]
    fn test_overtime_share_is_reported() {
        let record = record(
            &[
                ("Base pay", ComponentKind::BasePay, "2000.00"),
                ("Overtime", ComponentKind::Overtime, "1500.00"),
            ],
            &[],
        );
        let violations = validate(&record, &us_rules());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, ComplianceRule::MaxOvertimeRatio);
        assert_eq!(violations[0].actual, dec("0.4286"));
    }

    #[test]
    fn test_zero_gross_skips_ratio_rules() {
        let record = record(&[], &[]);
        let rules = ComplianceRules {
            max_deduction_ratio: Some(dec("0.5")),
            max_overtime_ratio: Some(dec("0.4")),
            ..ComplianceRules::default()
        };
        assert!(validate(&record, &rules).is_empty());
    }

    #[test]
    fn test_validator_resolves_jurisdiction_from_rule_set() {
        let config = test_config();
        let validator = ComplianceValidator::new(&config);

        let mut low = record(
            &[("Base pay", ComponentKind::BasePay, "1000.00")],
            &[],
        );
        assert!(validator.check(&low).unwrap().is_empty());

        low.rule_set = Some(RuleSetRef {
            id: "standard_usd".to_string(),
            version: 3,
        });
        let violations = validator.check(&low).unwrap();
        assert_eq!(violations[0].rule, ComplianceRule::MinimumNetPay);

        low.rule_set = Some(RuleSetRef {
            id: "standard_eur".to_string(),
            version: 1,
        });
        // no rules configured for de_default in the test config
        assert!(validator.check(&low).unwrap().is_empty());
    }
}
