//! Budget Period Entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::entity::Period;

/// A user's spending limit for one calendar month.
///
/// At most one exists per `(owner, month, year)`.
#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub id: i64,
    pub owner: String,
    pub month: u32,
    pub year: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    pub fn period(&self) -> Period {
        Period { month: self.month, year: self.year }
    }
}

/// Fields needed to create a budget
#[derive(Debug, Clone)]
pub struct NewBudget {
    pub owner: String,
    pub period: Period,
    pub amount: Decimal,
}
