//! Currency and rounding.
//!
//! All monetary amounts are [`Decimal`] values. Component amounts are
//! rounded to the currency's minor unit using round-half-away-from-zero.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

fn default_minor_units() -> u32 {
    2
}

/// A currency and the number of decimal places of its minor unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// The ISO-4217 code (e.g. "USD").
    pub code: String,
    /// Decimal places of the minor unit (2 for cents, 0 for JPY).
    #[serde(default = "default_minor_units")]
    pub minor_units: u32,
}

impl Currency {
    /// Creates a currency with the given code and minor units.
    pub fn new(code: impl Into<String>, minor_units: u32) -> Self {
        Self {
            code: code.into(),
            minor_units,
        }
    }

    /// Rounds an amount to this currency's minor unit.
    pub fn round(&self, amount: Decimal) -> Decimal {
        round_money(amount, self.minor_units)
    }
}

/// Rounds `amount` to `minor_units` decimal places, half away from zero.
///
/// # Example
///
/// ```
/// use payroll_engine::models::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let up = Decimal::from_str("2.345").unwrap();
/// let down = Decimal::from_str("-2.345").unwrap();
/// assert_eq!(round_money(up, 2), Decimal::from_str("2.35").unwrap());
/// assert_eq!(round_money(down, 2), Decimal::from_str("-2.35").unwrap());
/// ```
pub fn round_money(amount: Decimal, minor_units: u32) -> Decimal {
    amount.round_dp_with_strategy(minor_units, RoundingStrategy::MidpointAwayFromZero)
}

/// The exchange rate used for a calculation, captured once and stored with
/// the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateSnapshot {
    /// The contract currency code amounts were converted from.
    pub from: String,
    /// The branch currency code amounts were converted to.
    pub to: String,
    /// Units of `to` per unit of `from`.
    pub rate: Decimal,
    /// When the rate was taken.
    pub captured_at: DateTime<Utc>,
}
