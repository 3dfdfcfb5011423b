//! PostgreSQL Repositories
//!
//! sqlx-backed bindings of the storage traits. Schema lives in
//! `migrations/` and is applied through [`MIGRATOR`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::{
    BudgetStore, LedgerStore, ResourceOwnerLookup, StoreError, StoreResult, UserLookup, UserStore,
};
use crate::budget::entity::{Budget, NewBudget};
use crate::ledger::entity::{
    DateRange, Direction, EntryChange, FinancialSummary, LedgerEntry, Period, TypeSummary,
    YearSummary,
};
use crate::user::entity::{NewUser, User};

pub static MIGRATOR: Migrator = sqlx::migrate!();

const ENTRY_COLUMNS: &str = "id, user_id, amount, direction, type_id, created_at, updated_at";
const BUDGET_COLUMNS: &str = "id, user_id, month, year, amount, created_at";

/// Income and expense magnitudes, for grouped summary queries
const TOTAL_COLUMNS: &str = "COALESCE(SUM(e.amount) FILTER (WHERE e.direction = 'in'), 0)::BIGINT AS income, \
                             COALESCE(SUM(e.amount) FILTER (WHERE e.direction = 'out'), 0)::BIGINT AS expense";

fn parse_totals(row: &PgRow) -> StoreResult<FinancialSummary> {
    Ok(FinancialSummary::new(row.try_get("income")?, row.try_get("expense")?))
}

// ============================================================================
// Users
// ============================================================================

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &PgRow) -> StoreResult<User> {
        Ok(User {
            username: row.try_get("username")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl UserLookup for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT username, name, email, phone, password_hash, created_at, updated_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_row).transpose()
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query(
            "INSERT INTO users (username, name, email, phone, password_hash) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING username, name, email, phone, password_hash, created_at, updated_at",
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;

        debug!(username = %user.username, "Inserted user");
        Self::parse_row(&row)
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE username = $2")
            .bind(password_hash)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// Ledger entries
// ============================================================================

pub struct PgLedgerRepository {
    pool: PgPool,
}

impl PgLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &PgRow) -> StoreResult<LedgerEntry> {
        let direction: String = row.try_get("direction")?;
        let direction = direction
            .parse::<Direction>()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(LedgerEntry {
            id: row.try_get("id")?,
            owner: row.try_get("user_id")?,
            amount: row.try_get("amount")?,
            direction,
            type_id: row.try_get("type_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl ResourceOwnerLookup for PgLedgerRepository {
    async fn find_owner(&self, resource_id: i64) -> StoreResult<Option<String>> {
        let owner = sqlx::query_scalar::<_, String>("SELECT user_id FROM ledger_entries WHERE id = $1")
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerRepository {
    async fn find_type_id(&self, type_name: &str) -> StoreResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM financial_types WHERE name = $1")
            .bind(type_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert(&self, owner: &str, change: EntryChange) -> StoreResult<LedgerEntry> {
        let query = format!(
            "INSERT INTO ledger_entries (user_id, amount, direction, type_id) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            ENTRY_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(owner)
            .bind(change.amount)
            .bind(change.direction.as_str())
            .bind(change.type_id)
            .fetch_one(&self.pool)
            .await?;

        Self::parse_row(&row)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<LedgerEntry>> {
        let query = format!("SELECT {} FROM ledger_entries WHERE id = $1", ENTRY_COLUMNS);

        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<LedgerEntry>> {
        let query = format!(
            "SELECT {} FROM ledger_entries WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            ENTRY_COLUMNS
        );

        let rows = sqlx::query(&query).bind(owner).fetch_all(&self.pool).await?;
        rows.iter().map(Self::parse_row).collect()
    }

    async fn update(&self, id: i64, change: EntryChange) -> StoreResult<Option<LedgerEntry>> {
        let query = format!(
            "UPDATE ledger_entries SET amount = $1, direction = $2, type_id = $3, updated_at = now() \
             WHERE id = $4 RETURNING {}",
            ENTRY_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(change.amount)
            .bind(change.direction.as_str())
            .bind(change.type_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn delete(&self, id: i64) -> StoreResult<Option<LedgerEntry>> {
        let query = format!("DELETE FROM ledger_entries WHERE id = $1 RETURNING {}", ENTRY_COLUMNS);

        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn summarize(&self, owner: &str, range: DateRange) -> StoreResult<Option<FinancialSummary>> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS entries, \
                    COALESCE(SUM(amount) FILTER (WHERE direction = 'in'), 0)::BIGINT AS income, \
                    COALESCE(SUM(amount) FILTER (WHERE direction = 'out'), 0)::BIGINT AS expense \
             FROM ledger_entries \
             WHERE user_id = $1 AND created_at >= $2 AND created_at < $3",
        )
        .bind(owner)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        let entries: i64 = row.try_get("entries")?;
        if entries == 0 {
            return Ok(None);
        }

        Ok(Some(FinancialSummary::new(row.try_get("income")?, row.try_get("expense")?)))
    }

    async fn summarize_each_year(&self, owner: &str) -> StoreResult<Vec<YearSummary>> {
        let query = format!(
            "SELECT EXTRACT(YEAR FROM e.created_at AT TIME ZONE 'UTC')::INTEGER AS year, {} \
             FROM ledger_entries e \
             WHERE e.user_id = $1 \
             GROUP BY 1 ORDER BY 1",
            TOTAL_COLUMNS
        );

        let rows = sqlx::query(&query).bind(owner).fetch_all(&self.pool).await?;
        debug!(owner, years = rows.len(), "Summarized ledger by year");

        rows.iter()
            .map(|row| -> StoreResult<YearSummary> {
                Ok(YearSummary {
                    year: row.try_get("year")?,
                    summary: parse_totals(row)?,
                })
            })
            .collect()
    }

    async fn summarize_by_type(&self, owner: &str, range: DateRange) -> StoreResult<Vec<TypeSummary>> {
        let query = format!(
            "SELECT t.id AS type_id, t.name AS type_name, {} \
             FROM ledger_entries e \
             JOIN financial_types t ON t.id = e.type_id \
             WHERE e.user_id = $1 AND e.created_at >= $2 AND e.created_at < $3 \
             GROUP BY t.id, t.name ORDER BY t.id",
            TOTAL_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(owner)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> StoreResult<TypeSummary> {
                Ok(TypeSummary {
                    type_id: row.try_get("type_id")?,
                    type_name: row.try_get("type_name")?,
                    summary: parse_totals(row)?,
                })
            })
            .collect()
    }
}

// ============================================================================
// Budgets
// ============================================================================

pub struct PgBudgetRepository {
    pool: PgPool,
}

impl PgBudgetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &PgRow) -> StoreResult<Budget> {
        let month: i32 = row.try_get("month")?;
        let month = u32::try_from(month)
            .map_err(|_| StoreError::Backend(format!("invalid stored month: {}", month)))?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(Budget {
            id: row.try_get("id")?,
            owner: row.try_get("user_id")?,
            month,
            year: row.try_get("year")?,
            amount: row.try_get("amount")?,
            created_at,
        })
    }

    async fn fetch_where(&self, clause: &str, owner: &str, year: Option<i32>) -> StoreResult<Vec<Budget>> {
        let query = format!(
            "SELECT {} FROM budgets WHERE {} ORDER BY year DESC, month DESC",
            BUDGET_COLUMNS, clause
        );

        let mut q = sqlx::query(&query).bind(owner);
        if let Some(year) = year {
            q = q.bind(year);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(Self::parse_row).collect()
    }
}

#[async_trait]
impl BudgetStore for PgBudgetRepository {
    async fn insert(&self, budget: NewBudget) -> StoreResult<Budget> {
        let query = format!(
            "INSERT INTO budgets (user_id, month, year, amount) VALUES ($1, $2, $3, $4) RETURNING {}",
            BUDGET_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&budget.owner)
            .bind(budget.period.month as i32)
            .bind(budget.period.year)
            .bind(budget.amount)
            .fetch_one(&self.pool)
            .await?;

        Self::parse_row(&row)
    }

    async fn find(&self, owner: &str, period: Period) -> StoreResult<Option<Budget>> {
        let query = format!(
            "SELECT {} FROM budgets WHERE user_id = $1 AND month = $2 AND year = $3",
            BUDGET_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(owner)
            .bind(period.month as i32)
            .bind(period.year)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn update_amount(&self, id: i64, amount: Decimal) -> StoreResult<Option<Budget>> {
        let query = format!("UPDATE budgets SET amount = $1 WHERE id = $2 RETURNING {}", BUDGET_COLUMNS);

        let row = sqlx::query(&query)
            .bind(amount)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn history(&self, owner: &str) -> StoreResult<Vec<Budget>> {
        self.fetch_where("user_id = $1", owner, None).await
    }

    async fn history_for_year(&self, owner: &str, year: i32) -> StoreResult<Vec<Budget>> {
        self.fetch_where("user_id = $1 AND year = $2", owner, Some(year)).await
    }
}
