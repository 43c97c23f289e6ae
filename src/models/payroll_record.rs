//! Payroll record models.
//!
//! This module contains the [`PayrollRecord`] type and its associated
//! structures: pay components, record status, the version-chain identifiers
//! and the calculation trace captured when a record is computed.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CorrectionId, Currency, ExchangeRateSnapshot, PayPeriod};

/// Identifier shared by every version of one employee's record for a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Generates a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A reference to one version of a payroll record.
///
/// Approval steps, corrections and audit entries refer to records only
/// through this pair so history stays reconstructible after corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    /// The record chain identifier.
    pub id: RecordId,
    /// The version within the chain (starting at 1).
    pub version: u32,
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.id, self.version)
    }
}

/// The version-chain key: one employee, one period.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PayrollKey {
    /// The employee the chain belongs to.
    pub employee_id: String,
    /// The pay period.
    pub period: PayPeriod,
}

impl PayrollKey {
    /// Creates a key.
    pub fn new(employee_id: impl Into<String>, period: PayPeriod) -> Self {
        Self {
            employee_id: employee_id.into(),
            period,
        }
    }
}

impl fmt::Display for PayrollKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.employee_id, self.period)
    }
}

/// What a pay component represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Base pay pro-rated by attendance.
    BasePay,
    /// Overtime at the configured multiplier.
    Overtime,
    /// A fixed allowance.
    Allowance,
    /// A statutory deduction from the rule set.
    StatutoryDeduction,
    /// A voluntary deduction supplied with the inputs.
    VoluntaryDeduction,
    /// A component added by an error correction.
    Adjustment,
}

/// Which list of a record a component lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentSide {
    /// The earnings list.
    Earning,
    /// The deductions list.
    Deduction,
}

impl fmt::Display for ComponentSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentSide::Earning => f.write_str("earning"),
            ComponentSide::Deduction => f.write_str("deduction"),
        }
    }
}

/// A named amount on a payroll record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayComponent {
    /// Display name, unique within its list.
    pub name: String,
    /// What the component represents.
    pub kind: ComponentKind,
    /// The amount in the record currency, rounded to its minor unit.
    pub amount: Decimal,
}

impl PayComponent {
    /// Creates a component.
    pub fn new(name: impl Into<String>, kind: ComponentKind, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            kind,
            amount,
        }
    }
}

/// Lifecycle state of a payroll record version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Created but not (successfully) calculated, or returned by a rejection.
    Draft,
    /// Calculated and awaiting submission.
    Calculated,
    /// Waiting for a decision at `level`.
    PendingApproval {
        /// The approval level awaiting a decision.
        level: u8,
    },
    /// Every approval level approved.
    Approved,
    /// Visible to the employee; immutable from here on.
    Released,
    /// Superseded by a corrected version.
    Corrected,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Draft => f.write_str("draft"),
            RecordStatus::Calculated => f.write_str("calculated"),
            RecordStatus::PendingApproval { level } => write!(f, "pending_approval({})", level),
            RecordStatus::Approved => f.write_str("approved"),
            RecordStatus::Released => f.write_str("released"),
            RecordStatus::Corrected => f.write_str("corrected"),
        }
    }
}

/// Identifies the rule set (and its revision) a record was calculated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetRef {
    /// The rule set identifier.
    pub id: String,
    /// The rule set revision.
    pub version: u32,
}

/// A single step in the calculation trace recording a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// One employee's pay for one period, at one version.
///
/// Invariants maintained by every constructor in the crate:
/// `gross = Σ earnings` and `net = gross − Σ deductions`, with every
/// component already rounded to the currency's minor unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRecord {
    /// The chain identifier shared by all versions.
    pub id: RecordId,
    /// The version number within the chain.
    pub version: u32,
    /// The employee paid by this record.
    pub employee_id: String,
    /// The branch the employee was processed under.
    pub branch_id: String,
    /// The pay period.
    pub period: PayPeriod,
    /// Earning components in calculation order.
    pub earnings: Vec<PayComponent>,
    /// Deduction components in calculation order.
    pub deductions: Vec<PayComponent>,
    /// Sum of earnings.
    pub gross: Decimal,
    /// Gross less deductions.
    pub net: Decimal,
    /// The currency of every amount on the record.
    pub currency: Currency,
    /// Lifecycle state.
    pub status: RecordStatus,
    /// Rule set snapshot used for the calculation.
    pub rule_set: Option<RuleSetRef>,
    /// Exchange rate snapshot, when the contract currency differed.
    pub exchange_rate: Option<ExchangeRateSnapshot>,
    /// Steps taken by the calculator.
    #[serde(default)]
    pub trace: Vec<CalculationStep>,
    /// When the amounts were last computed.
    pub calculated_at: Option<DateTime<Utc>>,
    /// The process or actor that computed the amounts.
    pub calculated_by: Option<String>,
    /// The version this one replaced.
    pub previous_version: Option<u32>,
    /// The version that replaced this one.
    pub superseded_by: Option<u32>,
    /// The correction that produced this version.
    pub correction_id: Option<CorrectionId>,
    /// When the version was released.
    pub released_at: Option<DateTime<Utc>>,
    /// Who released the version.
    pub released_by: Option<String>,
}

impl PayrollRecord {
    /// Creates an empty `Draft` record at version 1.
    pub fn draft(
        employee_id: impl Into<String>,
        branch_id: impl Into<String>,
        period: PayPeriod,
        currency: Currency,
    ) -> Self {
        Self {
            id: RecordId::new(),
            version: 1,
            employee_id: employee_id.into(),
            branch_id: branch_id.into(),
            period,
            earnings: Vec::new(),
            deductions: Vec::new(),
            gross: Decimal::ZERO,
            net: Decimal::ZERO,
            currency,
            status: RecordStatus::Draft,
            rule_set: None,
            exchange_rate: None,
            trace: Vec::new(),
            calculated_at: None,
            calculated_by: None,
            previous_version: None,
            superseded_by: None,
            correction_id: None,
            released_at: None,
            released_by: None,
        }
    }

    /// Returns the `(id, version)` reference of this record.
    pub fn reference(&self) -> RecordRef {
        RecordRef {
            id: self.id,
            version: self.version,
        }
    }

    /// Returns the version-chain key of this record.
    pub fn key(&self) -> PayrollKey {
        PayrollKey::new(self.employee_id.clone(), self.period)
    }

    /// Returns the sum of all deductions.
    pub fn total_deductions(&self) -> Decimal {
        self.deductions.iter().map(|d| d.amount).sum()
    }

    /// Returns the components on `side`.
    pub fn components(&self, side: ComponentSide) -> &[PayComponent] {
        match side {
            ComponentSide::Earning => &self.earnings,
            ComponentSide::Deduction => &self.deductions,
        }
    }

    /// Re-derives gross and net from the component lists.
    pub fn recompute_totals(&mut self) {
        self.gross = self.earnings.iter().map(|e| e.amount).sum();
        self.net = self.gross - self.total_deductions();
    }

    /// Returns true if gross and net agree with the components.
    pub fn totals_consistent(&self) -> bool {
        let gross: Decimal = self.earnings.iter().map(|e| e.amount).sum();
        gross == self.gross && self.net == self.gross - self.total_deductions()
    }
}
