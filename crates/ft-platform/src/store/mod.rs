//! Storage Collaborators
//!
//! Narrow async traits the request pipeline and handlers depend on, with a
//! PostgreSQL binding (`postgres`) and an in-process binding (`memory`).
//!
//! Not-found is `Ok(None)`; constraint violations and backend failures are
//! distinct [`StoreError`] variants so callers switch on kind.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::budget::entity::{Budget, NewBudget};
use crate::ledger::entity::{
    DateRange, EntryChange, FinancialSummary, LedgerEntry, Period, TypeSummary, YearSummary,
};
use crate::shared::error::PlatformError;
use crate::user::entity::{NewUser, User};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::{PgBudgetRepository, PgLedgerRepository, PgUserRepository, MIGRATOR};

/// Constraint names shared by both bindings
pub mod constraints {
    pub const USERS_PKEY: &str = "users_pkey";
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const BUDGETS_PERIOD: &str = "budgets_user_month_year_key";
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn unique(constraint: impl Into<String>) -> Self {
        Self::UniqueViolation { constraint: constraint.into() }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::unique(db.constraint().unwrap_or("unique"));
            }
        }
        StoreError::Backend(e.to_string())
    }
}

impl From<StoreError> for PlatformError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation { constraint } => PlatformError::duplicate("Entity", constraint),
            StoreError::Backend(message) => PlatformError::lookup_failed(message),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Resolves a session's username to a user record.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait UserStore: UserLookup {
    /// Fails with `UniqueViolation` on a taken username or email.
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<()>;
}

/// Resolves the recorded owner of a resource.
#[async_trait]
pub trait ResourceOwnerLookup: Send + Sync {
    async fn find_owner(&self, resource_id: i64) -> StoreResult<Option<String>>;
}

#[async_trait]
pub trait LedgerStore: ResourceOwnerLookup {
    /// Type id for a type name, if the name is known.
    async fn find_type_id(&self, type_name: &str) -> StoreResult<Option<i64>>;

    async fn insert(&self, owner: &str, change: EntryChange) -> StoreResult<LedgerEntry>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<LedgerEntry>>;

    /// Newest first.
    async fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<LedgerEntry>>;

    async fn update(&self, id: i64, change: EntryChange) -> StoreResult<Option<LedgerEntry>>;

    async fn delete(&self, id: i64) -> StoreResult<Option<LedgerEntry>>;

    /// Totals over `range`; `None` when the owner has no entries in it.
    async fn summarize(&self, owner: &str, range: DateRange) -> StoreResult<Option<FinancialSummary>>;

    /// One row per year with entries, oldest first.
    async fn summarize_each_year(&self, owner: &str) -> StoreResult<Vec<YearSummary>>;

    /// One row per entry type used in `range`, ordered by type id.
    async fn summarize_by_type(&self, owner: &str, range: DateRange) -> StoreResult<Vec<TypeSummary>>;

    /// The period's aggregated expense as a negative number.
    async fn expense_total(&self, owner: &str, period: Period) -> StoreResult<Option<i64>> {
        let range = period
            .range()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(self.summarize(owner, range).await?.map(|s| s.total_expense))
    }
}

#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Fails with `UniqueViolation` when the owner already has a budget for the period.
    async fn insert(&self, budget: NewBudget) -> StoreResult<Budget>;

    async fn find(&self, owner: &str, period: Period) -> StoreResult<Option<Budget>>;

    async fn update_amount(&self, id: i64, amount: Decimal) -> StoreResult<Option<Budget>>;

    /// Newest period first.
    async fn history(&self, owner: &str) -> StoreResult<Vec<Budget>>;

    async fn history_for_year(&self, owner: &str, year: i32) -> StoreResult<Vec<Budget>>;
}
