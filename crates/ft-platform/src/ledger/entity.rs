//! Ledger Entry Entity

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::error::{PlatformError, Result};

/// Type id used when an entry's type name is not recognised
pub const OTHER_TYPE_ID: i64 = 10;

/// Money flow of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Negative amounts are expenses; everything else is income.
    pub fn from_signed_amount(amount: i64) -> Self {
        if amount < 0 {
            Direction::Out
        } else {
            Direction::In
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(PlatformError::internal(format!("unknown direction: {}", other))),
        }
    }
}

/// One recorded transaction
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub owner: String,
    /// Always positive; sign is carried by `direction`
    pub amount: i64,
    pub direction: Direction,
    pub type_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn signed_amount(&self) -> i64 {
        match self.direction {
            Direction::In => self.amount,
            Direction::Out => -self.amount,
        }
    }

    pub fn period(&self) -> Period {
        Period::of(self.created_at)
    }
}

/// Amount, direction and type of an entry being written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChange {
    pub amount: i64,
    pub direction: Direction,
    pub type_id: i64,
}

impl EntryChange {
    /// Split a non-zero signed amount into magnitude and direction.
    pub fn from_signed(amount: i64, type_id: i64) -> Result<Self> {
        if amount == 0 {
            return Err(PlatformError::validation("amount cannot be zero"));
        }
        let magnitude = amount
            .checked_abs()
            .ok_or_else(|| PlatformError::validation("amount out of range"))?;

        Ok(Self {
            amount: magnitude,
            direction: Direction::from_signed_amount(amount),
            type_id,
        })
    }
}

/// Half-open time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    pub fn year(year: i32) -> Result<Self> {
        Ok(Self {
            start: month_start(year, 1)?,
            end: month_start(year + 1, 1)?,
        })
    }
}

fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| PlatformError::validation(format!("invalid period {}/{}", month, year)))
}

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub month: u32,
    pub year: i32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PlatformError::validation("month must be between 1 and 12"));
        }
        Ok(Self { month, year })
    }

    pub fn of(at: DateTime<Utc>) -> Self {
        Self { month: at.month(), year: at.year() }
    }

    pub fn current() -> Self {
        Self::of(Utc::now())
    }

    pub fn range(&self) -> Result<DateRange> {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };

        Ok(DateRange {
            start: month_start(self.year, self.month)?,
            end: month_start(next_year, next_month)?,
        })
    }
}

/// Income and expense totals over a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FinancialSummary {
    pub total_income: i64,
    /// Reported as a negative number
    pub total_expense: i64,
    pub balance: i64,
}

impl FinancialSummary {
    pub fn new(income: i64, expense_magnitude: i64) -> Self {
        Self {
            total_income: income,
            total_expense: -expense_magnitude,
            balance: income - expense_magnitude,
        }
    }
}

/// Totals for one calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    #[serde(flatten)]
    pub summary: FinancialSummary,
}

/// Totals for one entry type over a range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSummary {
    pub type_id: i64,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(flatten)]
    pub summary: FinancialSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entry_change_from_signed() {
        let out = EntryChange::from_signed(-250, 2).unwrap();
        assert_eq!(out.amount, 250);
        assert_eq!(out.direction, Direction::Out);

        let inc = EntryChange::from_signed(1000, 1).unwrap();
        assert_eq!(inc.direction, Direction::In);

        assert!(EntryChange::from_signed(0, 1).is_err());
        assert!(EntryChange::from_signed(i64::MIN, 1).is_err());
    }

    #[test]
    fn test_direction_wire_format() {
        assert_eq!(serde_json::to_string(&Direction::Out).unwrap(), "\"out\"");
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::In);
        assert!("IN".parse::<Direction>().is_err());
    }

    #[test]
    fn test_december_range_rolls_over() {
        let range = Period::new(12, 2025).unwrap().range().unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert!(range.contains(Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap()));
        assert!(!range.contains(range.end));
    }

    #[test]
    fn test_invalid_month() {
        assert!(Period::new(0, 2026).is_err());
        assert!(Period::new(13, 2026).is_err());
    }

    #[test]
    fn test_summary_signs() {
        let summary = FinancialSummary::new(1000, 250);
        assert_eq!(summary.total_expense, -250);
        assert_eq!(summary.balance, 750);
    }

    #[test]
    fn test_type_summary_flattens_totals() {
        let json = serde_json::to_value(TypeSummary {
            type_id: 2,
            type_name: "Food".into(),
            summary: FinancialSummary::new(0, 300),
        })
        .unwrap();

        assert_eq!(json["type"], "Food");
        assert_eq!(json["total_expense"], -300);
        assert_eq!(json["balance"], -300);
    }
}
