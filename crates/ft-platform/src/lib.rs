//! Fintrack Platform
//!
//! Personal finance tracking service:
//! - Session tokens (HS256) and password hashing
//! - Request authentication ([`AuthGate`]) and resource ownership checks ([`OwnershipGuard`])
//! - Ledger entries and income/expense summaries
//! - Monthly budgets and budget usage
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `api` - REST endpoints
//!
//! Storage traits and their PostgreSQL / in-memory bindings live in `store`.

// Aggregates
pub mod user;
pub mod ledger;
pub mod budget;

// Authentication
pub mod auth;

// Infrastructure
pub mod shared;
pub mod store;
pub mod router;

pub use shared::error::{
    BudgetError, CredentialError, InfrastructureError, OwnershipError, PlatformError,
    PrincipalError, Result,
};
pub use shared::middleware::{AppState, AuthGate, Authenticated};
pub use shared::ownership::{OwnedEntry, OwnershipGuard};

pub use auth::{Argon2Config, JwtMaker, PasswordPolicy, PasswordService, Payload, TokenMaker};
pub use user::{NewUser, Principal, User};
pub use ledger::{Direction, FinancialSummary, LedgerEntry, Period};
pub use budget::{compute_usage, Budget, UsageResult};

pub use store::{
    InMemoryStore, PgBudgetRepository, PgLedgerRepository, PgUserRepository, StoreError, MIGRATOR,
};
pub use router::router;
