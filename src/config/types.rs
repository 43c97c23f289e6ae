//! Configuration types for payroll processing.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{Currency, RuleSetRef};

fn default_worker_pool_size() -> usize {
    4
}

fn default_approval_sla_hours() -> i64 {
    48
}

/// Engine-wide settings from `engine.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Maximum concurrent per-employee calculations in a branch run.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    /// Hours a record may wait at one approval level before it is reported overdue.
    #[serde(default = "default_approval_sla_hours")]
    pub approval_sla_hours: i64,
    /// Template used to render payslips on release.
    pub payslip_template: String,
    /// Rule set used for branches without an explicit mapping.
    pub default_rule_set: String,
    /// Branch id to rule set id.
    #[serde(default)]
    pub branch_rule_sets: HashMap<String, String>,
}

/// One level of the approval chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalLevel {
    /// The level number (1-based, contiguous).
    pub level: u8,
    /// A human-readable label.
    pub name: String,
    /// The role an approver must hold to decide at this level.
    pub role: String,
}

/// The ordered approval chain from `approval.yaml`.
///
/// This table alone drives the approval state machine: `decide` consults
/// it for the role of a level and for the final level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalChain {
    /// Levels in ascending order.
    pub levels: Vec<ApprovalLevel>,
    /// Role required to release approved records, if restricted.
    #[serde(default)]
    pub release_role: Option<String>,
    /// Role required to approve or reject error corrections.
    pub correction_approver_role: String,
}

impl ApprovalChain {
    /// Checks that levels are `1..=N` in order with non-empty roles.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |message: String| EngineError::InvalidRuleConfiguration {
            rule_set: "approval_chain".to_string(),
            message,
        };

        if self.levels.is_empty() {
            return Err(invalid("at least one approval level is required".to_string()));
        }
        for (index, level) in self.levels.iter().enumerate() {
            let expected = index + 1;
            if usize::from(level.level) != expected {
                return Err(invalid(format!(
                    "level {} found where level {} was expected",
                    level.level, expected
                )));
            }
            if level.role.trim().is_empty() {
                return Err(invalid(format!("level {} has no role", level.level)));
            }
        }
        if self.correction_approver_role.trim().is_empty() {
            return Err(invalid("correction_approver_role is empty".to_string()));
        }
        Ok(())
    }

    /// Returns the final approval level.
    pub fn max_level(&self) -> u8 {
        self.levels.last().map(|l| l.level).unwrap_or(0)
    }

    /// Returns the role required at `level`.
    pub fn role_for(&self, level: u8) -> Option<&str> {
        self.levels
            .iter()
            .find(|l| l.level == level)
            .map(|l| l.role.as_str())
    }
}

/// Statutory thresholds for one jurisdiction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceRules {
    /// Net pay may not fall below this amount.
    #[serde(default)]
    pub minimum_net_pay: Option<Decimal>,
    /// Total deductions may not exceed this amount.
    #[serde(default)]
    pub max_total_deductions: Option<Decimal>,
    /// Total deductions may not exceed this share of gross (0-1).
    #[serde(default)]
    pub max_deduction_ratio: Option<Decimal>,
    /// Overtime earnings may not exceed this share of gross (0-1).
    #[serde(default)]
    pub max_overtime_ratio: Option<Decimal>,
}

/// Compliance configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Map of jurisdiction code to rules.
    pub jurisdictions: HashMap<String, ComplianceRules>,
}

/// A fixed allowance paid every period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowanceRule {
    /// Component name.
    pub name: String,
    /// Amount in the rule set currency.
    pub amount: Decimal,
}

/// How a statutory deduction is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeductionBasis {
    /// A fixed amount in the rule set currency.
    Fixed {
        /// The amount.
        amount: Decimal,
    },
    /// A share of gross pay.
    PercentOfGross {
        /// The rate as a fraction (0.062 for 6.2%).
        rate: Decimal,
    },
}

/// A statutory deduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionRule {
    /// Component name.
    pub name: String,
    /// How the amount is computed.
    pub basis: DeductionBasis,
    /// Upper bound on the computed amount.
    #[serde(default)]
    pub cap: Option<Decimal>,
}

/// A conversion rate into the rule set currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// The contract currency code.
    pub from: String,
    /// Rule set currency units per unit of `from`.
    pub rate: Decimal,
}

/// The pay rules for a branch's jurisdiction, from `rule_sets/*.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// The rule set identifier.
    pub id: String,
    /// Revision, bumped whenever the rules change.
    pub version: u32,
    /// Jurisdiction code used to pick compliance rules.
    pub jurisdiction: String,
    /// The branch (payout) currency.
    pub currency: Currency,
    /// Hours that earn the full monthly base pay.
    pub standard_monthly_hours: Decimal,
    /// Hours credited per approved leave day.
    pub hours_per_leave_day: Decimal,
    /// Overtime pay multiplier over the hourly rate.
    pub overtime_multiplier: Decimal,
    /// Fixed allowances.
    #[serde(default)]
    pub allowances: Vec<AllowanceRule>,
    /// Statutory deductions, applied in order.
    #[serde(default)]
    pub statutory_deductions: Vec<DeductionRule>,
    /// Conversion rates for contract currencies.
    #[serde(default)]
    pub exchange_rates: Vec<ExchangeRate>,
}

impl RuleSet {
    /// Returns the `(id, version)` snapshot stored on records.
    pub fn reference(&self) -> RuleSetRef {
        RuleSetRef {
            id: self.id.clone(),
            version: self.version,
        }
    }

    /// Returns the rate converting `currency` into the rule set currency.
    pub fn exchange_rate_from(&self, currency: &str) -> Option<Decimal> {
        self.exchange_rates
            .iter()
            .find(|r| r.from == currency)
            .map(|r| r.rate)
    }

    /// Checks the rules for values the calculator cannot work with.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |message: String| EngineError::InvalidRuleConfiguration {
            rule_set: self.id.clone(),
            message,
        };

        if self.standard_monthly_hours <= Decimal::ZERO {
            return Err(invalid("standard_monthly_hours must be positive".to_string()));
        }
        if self.hours_per_leave_day <= Decimal::ZERO {
            return Err(invalid("hours_per_leave_day must be positive".to_string()));
        }
        if self.overtime_multiplier < Decimal::ONE {
            return Err(invalid("overtime_multiplier must be at least 1".to_string()));
        }
        for allowance in &self.allowances {
            if allowance.amount < Decimal::ZERO {
                return Err(invalid(format!("allowance '{}' is negative", allowance.name)));
            }
        }
        for deduction in &self.statutory_deductions {
            match deduction.basis {
                DeductionBasis::Fixed { amount } if amount < Decimal::ZERO => {
                    return Err(invalid(format!("deduction '{}' is negative", deduction.name)));
                }
                DeductionBasis::PercentOfGross { rate }
                    if rate < Decimal::ZERO || rate > Decimal::ONE =>
                {
                    return Err(invalid(format!(
                        "deduction '{}' rate {} is outside 0..1",
                        deduction.name, rate
                    )));
                }
                _ => {}
            }
            if deduction.cap.is_some_and(|cap| cap < Decimal::ZERO) {
                return Err(invalid(format!("deduction '{}' cap is negative", deduction.name)));
            }
        }
        for rate in &self.exchange_rates {
            if rate.rate <= Decimal::ZERO {
                return Err(invalid(format!("exchange rate from {} must be positive", rate.from)));
            }
        }
        Ok(())
    }
}
