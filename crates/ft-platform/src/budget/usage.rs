//! Budget Usage
//!
//! Derives how much of a month's budget has been spent.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Usage string reported when no ratio is computed
pub const ZERO_USAGE: &str = "0%";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageResult {
    #[serde(with = "rust_decimal::serde::float")]
    pub budget: Decimal,
    pub spent: u64,
    #[serde(rename = "usage")]
    pub usage_percent: String,
}

impl UsageResult {
    /// State reported when the period has no budget at all.
    pub fn no_budget() -> Self {
        Self {
            budget: Decimal::ZERO,
            spent: 0,
            usage_percent: ZERO_USAGE.to_string(),
        }
    }
}

/// Compute spend and usage for one period.
///
/// `expense_total` is the period's aggregated expense, which storage
/// reports as a negative number; its magnitude is the spend.
pub fn compute_usage(budget: Option<Decimal>, expense_total: Option<i64>) -> UsageResult {
    let Some(budget) = budget else {
        return UsageResult::no_budget();
    };

    let spent = expense_total.map(i64::unsigned_abs).unwrap_or(0);

    // A zero budget keeps the "0%" display and skips the division.
    let usage_percent = if budget.is_zero() {
        ZERO_USAGE.to_string()
    } else {
        format_percent(spent, budget)
    };

    UsageResult { budget, spent, usage_percent }
}

/// Ratios beyond `Decimal`'s range saturate at `Decimal::MAX`.
fn format_percent(spent: u64, budget: Decimal) -> String {
    let percent = Decimal::from(spent)
        .checked_div(budget)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|p| p.abs().round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::MAX);
    format!("{:.2}%", percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_no_budget() {
        let usage = compute_usage(None, Some(-500));
        assert_eq!(usage, UsageResult { budget: dec(0), spent: 0, usage_percent: "0%".into() });
    }

    #[test]
    fn test_quarter_spent() {
        let usage = compute_usage(Some(dec(1000)), Some(-250));
        assert_eq!(usage.budget, dec(1000));
        assert_eq!(usage.spent, 250);
        assert_eq!(usage.usage_percent, "25.00%");
    }

    #[test]
    fn test_zero_budget_skips_division() {
        let usage = compute_usage(Some(dec(0)), Some(-100));
        assert_eq!(usage.budget, dec(0));
        assert_eq!(usage.spent, 100);
        assert_eq!(usage.usage_percent, "0%");
    }

    #[test]
    fn test_nothing_spent() {
        for total in [Some(0), None] {
            let usage = compute_usage(Some(dec(500)), total);
            assert_eq!(usage.spent, 0);
            assert_eq!(usage.usage_percent, "0.00%");
        }
    }

    #[test]
    fn test_positive_total_is_still_spend() {
        let usage = compute_usage(Some(dec(200)), Some(50));
        assert_eq!(usage.spent, 50);
        assert_eq!(usage.usage_percent, "25.00%");
    }

    #[test]
    fn test_negative_budget_never_yields_negative_percent() {
        let usage = compute_usage(Some(dec(-200)), Some(-50));
        assert_eq!(usage.usage_percent, "25.00%");
    }

    #[test]
    fn test_rounding_and_overspend() {
        assert_eq!(compute_usage(Some(dec(3)), Some(-1)).usage_percent, "33.33%");
        assert_eq!(compute_usage(Some(dec(3)), Some(-2)).usage_percent, "66.67%");
        assert_eq!(compute_usage(Some(dec(100)), Some(-150)).usage_percent, "150.00%");
    }

    #[test]
    fn test_fractional_budget() {
        let budget = Decimal::new(12345, 2); // 123.45
        assert_eq!(compute_usage(Some(budget), Some(-100)).usage_percent, "81.00%");
    }

    #[test]
    fn test_extreme_total_does_not_overflow() {
        let usage = compute_usage(Some(dec(1)), Some(i64::MIN));
        assert_eq!(usage.spent, i64::MIN.unsigned_abs());
    }

    #[test]
    fn test_tiny_budget_saturates_instead_of_panicking() {
        let saturated = format!("{:.2}%", Decimal::MAX);

        let usage = compute_usage(Some(Decimal::new(1, 28)), Some(-1_000_000));
        assert_eq!(usage.spent, 1_000_000);
        assert_eq!(usage.usage_percent, saturated);

        let usage = compute_usage(Some(Decimal::new(1, 20)), Some(i64::MIN));
        assert_eq!(usage.usage_percent, saturated);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(compute_usage(Some(dec(1000)), Some(-250))).unwrap();
        assert_eq!(json["budget"], 1000.0);
        assert_eq!(json["spent"], 250);
        assert_eq!(json["usage"], "25.00%");
    }
}
