//! Budgets API
//!
//! Budgets are always created and updated for the current calendar month.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::budget::entity::{Budget, NewBudget};
use crate::budget::usage::{compute_usage, UsageResult};
use crate::ledger::entity::Period;
use crate::shared::api_common::JsonBody;
use crate::shared::error::{BudgetError, PlatformError, Result};
use crate::shared::middleware::{AppState, Authenticated};
use crate::store::StoreError;

/// Earliest year budget history can be requested for
pub const MIN_HISTORY_YEAR: i32 = 2000;

#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub amount: i64,
}

impl BudgetRequest {
    fn amount(&self) -> Result<Decimal> {
        if self.amount < 1 {
            return Err(PlatformError::validation("amount must be at least 1"));
        }
        Ok(Decimal::from(self.amount))
    }
}

/// Create the caller's budget for the current month
pub async fn create_budget(
    State(state): State<AppState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<BudgetRequest>,
) -> Result<Json<Budget>> {
    let amount = req.amount()?;
    let period = Period::current();

    let result = state
        .budgets
        .insert(NewBudget {
            owner: auth.username().to_string(),
            period,
            amount,
        })
        .await;

    match result {
        Ok(budget) => {
            info!(budget_id = budget.id, month = period.month, year = period.year, "Budget created");
            Ok(Json(budget))
        }
        Err(StoreError::UniqueViolation { .. }) => {
            info!(
                principal = %auth.username(),
                month = period.month,
                year = period.year,
                "Duplicate budget rejected"
            );
            Err(BudgetError::DuplicatePeriod { month: period.month, year: period.year }.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Replace the amount of the current month's budget
pub async fn update_budget(
    State(state): State<AppState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<BudgetRequest>,
) -> Result<Json<Budget>> {
    let amount = req.amount()?;

    let existing = state
        .budgets
        .find(auth.username(), Period::current())
        .await?
        .ok_or_else(|| PlatformError::not_found("Budget"))?;

    let budget = state
        .budgets
        .update_amount(existing.id, amount)
        .await?
        .ok_or_else(|| PlatformError::not_found("Budget"))?;

    info!(budget_id = budget.id, "Budget updated");
    Ok(Json(budget))
}

pub async fn get_current_budget(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<Budget>> {
    state
        .budgets
        .find(auth.username(), Period::current())
        .await?
        .map(Json)
        .ok_or_else(|| PlatformError::not_found("Budget"))
}

pub async fn get_budget_history(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<Vec<Budget>>> {
    let budgets = state.budgets.history(auth.username()).await?;
    if budgets.is_empty() {
        return Err(PlatformError::not_found("Budget"));
    }
    Ok(Json(budgets))
}

pub async fn get_budget_history_by_year(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(year): Path<String>,
) -> Result<Json<Vec<Budget>>> {
    let year: i32 = year
        .parse()
        .map_err(|_| PlatformError::validation("year must be a number"))?;

    let current = Utc::now().year();
    if year < MIN_HISTORY_YEAR || year > current {
        return Err(PlatformError::validation(format!(
            "year must be between {} and {}",
            MIN_HISTORY_YEAR, current
        )));
    }

    Ok(Json(state.budgets.history_for_year(auth.username(), year).await?))
}

/// Current month's budget against what has been spent so far
pub async fn get_budget_usage(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<UsageResult>> {
    let period = Period::current();

    let Some(budget) = state.budgets.find(auth.username(), period).await? else {
        return Ok(Json(UsageResult::no_budget()));
    };

    let expense_total = state.ledger.expense_total(auth.username(), period).await?;
    Ok(Json(compute_usage(Some(budget.amount), expense_total)))
}

pub fn budgets_router() -> Router<AppState> {
    Router::new()
        .route("/budgets", get(get_current_budget).post(create_budget).put(update_budget))
        .route("/budgets/current", get(get_current_budget))
        .route("/budgets/history", get(get_budget_history))
        .route("/budgets/history/:year", get(get_budget_history_by_year))
        .route("/budgets/usage", get(get_budget_usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_amount_minimum() {
        assert!(BudgetRequest { amount: 0 }.amount().is_err());
        assert!(BudgetRequest { amount: -5 }.amount().is_err());
        assert_eq!(BudgetRequest { amount: 1 }.amount().unwrap(), Decimal::ONE);
    }
}
