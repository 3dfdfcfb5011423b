//! Ledger API
//!
//! Entry recording and editing, plus income/expense summaries.

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::budget::usage::{compute_usage, UsageResult};
use crate::ledger::entity::{
    DateRange, EntryChange, FinancialSummary, LedgerEntry, Period, TypeSummary, YearSummary,
    OTHER_TYPE_ID,
};
use crate::shared::api_common::{JsonBody, QueryParams};
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::{AppState, Authenticated};
use crate::shared::ownership::OwnedEntry;

/// Earliest year a summary can be requested for
pub const MIN_SUMMARY_YEAR: i32 = 2020;

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    /// Signed amount; negative records an expense
    pub amount: i64,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateEntryResponse {
    pub message: String,
    pub entry: LedgerEntry,
    pub budget_usage: UsageResult,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub message: String,
    pub entry: LedgerEntry,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: i32,
}

/// Normalize a type name to its stored form, e.g. `fOOD` -> `Food`.
fn normalize_type_name(raw: &str) -> Result<String> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PlatformError::validation("type must contain only letters"));
    }

    let lower = raw.to_ascii_lowercase();
    let mut chars = lower.chars();
    Ok(match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    })
}

async fn resolve_change(state: &AppState, req: &EntryRequest) -> Result<EntryChange> {
    let type_name = normalize_type_name(&req.type_name)?;
    let type_id = state
        .ledger
        .find_type_id(&type_name)
        .await?
        .unwrap_or(OTHER_TYPE_ID);

    EntryChange::from_signed(req.amount, type_id)
}

fn validate_summary_year(year: i32) -> Result<()> {
    let current = Utc::now().year();
    if year < MIN_SUMMARY_YEAR || year > current {
        return Err(PlatformError::validation(format!(
            "year must be between {} and {}",
            MIN_SUMMARY_YEAR, current
        )));
    }
    Ok(())
}

async fn summarize(state: &AppState, owner: &str, range: DateRange) -> Result<Json<FinancialSummary>> {
    state
        .ledger
        .summarize(owner, range)
        .await?
        .map(Json)
        .ok_or_else(|| PlatformError::not_found("FinancialSummary"))
}

/// An empty grouping is reported as not found.
fn non_empty<T>(rows: Vec<T>) -> Result<Json<Vec<T>>> {
    if rows.is_empty() {
        return Err(PlatformError::not_found("FinancialSummary"));
    }
    Ok(Json(rows))
}

/// Record an entry and report the month's budget usage
pub async fn create_entry(
    State(state): State<AppState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<EntryRequest>,
) -> Result<Json<CreateEntryResponse>> {
    let change = resolve_change(&state, &req).await?;
    let entry = state.ledger.insert(auth.username(), change).await?;

    let period = entry.period();
    let budget = state.budgets.find(auth.username(), period).await?;
    let expense_total = state.ledger.expense_total(auth.username(), period).await?;
    let budget_usage = compute_usage(budget.map(|b| b.amount), expense_total);

    info!(
        entry_id = entry.id,
        direction = %entry.direction,
        usage = %budget_usage.usage_percent,
        "Ledger entry recorded"
    );

    Ok(Json(CreateEntryResponse {
        message: "entry saved".to_string(),
        entry,
        budget_usage,
    }))
}

/// List the caller's entries, newest first
pub async fn list_entries(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<Vec<LedgerEntry>>> {
    Ok(Json(state.ledger.list_by_owner(auth.username()).await?))
}

pub async fn get_entry(
    State(state): State<AppState>,
    owned: OwnedEntry,
) -> Result<Json<LedgerEntry>> {
    state
        .ledger
        .find_by_id(owned.id)
        .await?
        .map(Json)
        .ok_or_else(|| PlatformError::not_found("LedgerEntry"))
}

pub async fn update_entry(
    State(state): State<AppState>,
    owned: OwnedEntry,
    JsonBody(req): JsonBody<EntryRequest>,
) -> Result<Json<EntryResponse>> {
    let change = resolve_change(&state, &req).await?;

    let entry = state
        .ledger
        .update(owned.id, change)
        .await?
        .ok_or_else(|| PlatformError::not_found("LedgerEntry"))?;

    info!(entry_id = entry.id, "Ledger entry updated");
    Ok(Json(EntryResponse {
        message: "entry updated".to_string(),
        entry,
    }))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    owned: OwnedEntry,
) -> Result<Json<EntryResponse>> {
    let entry = state
        .ledger
        .delete(owned.id)
        .await?
        .ok_or_else(|| PlatformError::not_found("LedgerEntry"))?;

    info!(entry_id = entry.id, "Ledger entry deleted");
    Ok(Json(EntryResponse {
        message: "entry deleted".to_string(),
        entry,
    }))
}

pub async fn summary_current_month(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<FinancialSummary>> {
    let range = Period::current().range()?;
    summarize(&state, auth.username(), range).await
}

pub async fn summary_current_year(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<FinancialSummary>> {
    let range = DateRange::year(Utc::now().year())?;
    summarize(&state, auth.username(), range).await
}

pub async fn summary_by_month(
    State(state): State<AppState>,
    auth: Authenticated,
    QueryParams(query): QueryParams<MonthQuery>,
) -> Result<Json<FinancialSummary>> {
    validate_summary_year(query.year)?;
    let range = Period::new(query.month, query.year)?.range()?;
    summarize(&state, auth.username(), range).await
}

pub async fn summary_by_year(
    State(state): State<AppState>,
    auth: Authenticated,
    QueryParams(query): QueryParams<YearQuery>,
) -> Result<Json<FinancialSummary>> {
    validate_summary_year(query.year)?;
    let range = DateRange::year(query.year)?;
    summarize(&state, auth.username(), range).await
}

/// Totals for every year the caller has entries in
pub async fn summary_each_year(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<Vec<YearSummary>>> {
    non_empty(state.ledger.summarize_each_year(auth.username()).await?)
}

pub async fn summary_by_type_month(
    State(state): State<AppState>,
    auth: Authenticated,
    QueryParams(query): QueryParams<MonthQuery>,
) -> Result<Json<Vec<TypeSummary>>> {
    validate_summary_year(query.year)?;
    let range = Period::new(query.month, query.year)?.range()?;
    non_empty(state.ledger.summarize_by_type(auth.username(), range).await?)
}

pub async fn summary_by_type_year(
    State(state): State<AppState>,
    auth: Authenticated,
    QueryParams(query): QueryParams<YearQuery>,
) -> Result<Json<Vec<TypeSummary>>> {
    validate_summary_year(query.year)?;
    let range = DateRange::year(query.year)?;
    non_empty(state.ledger.summarize_by_type(auth.username(), range).await?)
}

pub fn entries_router() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route(
            "/entries/:id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}

pub fn summary_router() -> Router<AppState> {
    Router::new()
        .route("/summary/current-month", get(summary_current_month))
        .route("/summary/current-year", get(summary_current_year))
        .route("/summary/month", get(summary_by_month))
        .route("/summary/year", get(summary_by_year))
        .route("/summary/each-year", get(summary_each_year))
        .route("/summary/type/month-year", get(summary_by_type_month))
        .route("/summary/type/year", get(summary_by_type_year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_type_name() {
        assert_eq!(normalize_type_name("food").unwrap(), "Food");
        assert_eq!(normalize_type_name("SALARY").unwrap(), "Salary");
        assert!(normalize_type_name("").is_err());
        assert!(normalize_type_name("car rental").is_err());
        assert!(normalize_type_name("food2").is_err());
    }

    #[test]
    fn test_summary_year_bounds() {
        assert!(validate_summary_year(MIN_SUMMARY_YEAR).is_ok());
        assert!(validate_summary_year(Utc::now().year()).is_ok());
        assert!(validate_summary_year(MIN_SUMMARY_YEAR - 1).is_err());
        assert!(validate_summary_year(Utc::now().year() + 1).is_err());
    }
}
