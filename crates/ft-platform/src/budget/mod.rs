//! Budget Aggregate

pub mod entity;
pub mod usage;
pub mod api;

pub use entity::{Budget, NewBudget};
pub use usage::{compute_usage, UsageResult};
pub use api::budgets_router;
