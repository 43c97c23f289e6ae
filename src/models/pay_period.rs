//! Pay period model.
//!
//! This module contains the [`PayPeriod`] type: a calendar month for which
//! compensation is computed once.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A monthly pay period identified by year and month.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PayPeriod;
/// use chrono::NaiveDate;
///
/// let period = PayPeriod::new(2026, 1).unwrap();
/// assert_eq!(period.to_string(), "2026-01");
/// assert_eq!(period.last_day(), NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());
/// assert!(period.is_closed(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()));
/// assert!(!period.is_closed(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PayPeriod {
    /// The calendar year.
    pub year: i32,
    /// The calendar month (1-12).
    pub month: u32,
}

impl PayPeriod {
    /// Creates a pay period, validating the month.
    pub fn new(year: i32, month: u32) -> EngineResult<Self> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(EngineError::InvalidPeriod {
                period: format!("{:04}-{:02}", year, month),
                message: "month must be between 1 and 12".to_string(),
            });
        }
        Ok(Self { year, month })
    }

    /// Returns the period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Returns the first day of the period.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Returns the last day of the period.
    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    /// Returns the following period.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// A period is closed once its last day lies strictly before `as_of`.
    pub fn is_closed(&self, as_of: NaiveDate) -> bool {
        self.last_day() < as_of
    }

    /// Fails with `InvalidPeriod` unless the period is closed as of `as_of`.
    pub fn ensure_closed(&self, as_of: NaiveDate) -> EngineResult<()> {
        if self.first_day() > as_of {
            return Err(EngineError::InvalidPeriod {
                period: self.to_string(),
                message: format!("period lies in the future (as of {})", as_of),
            });
        }
        if !self.is_closed(as_of) {
            return Err(EngineError::InvalidPeriod {
                period: self.to_string(),
                message: format!("period is still open (as of {})", as_of),
            });
        }
        Ok(())
    }

    /// Returns true if `date` falls inside the period.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.first_day() && date <= self.last_day()
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
