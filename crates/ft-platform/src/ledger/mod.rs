//! Ledger Aggregate

pub mod entity;
pub mod api;

pub use entity::{DateRange, Direction, EntryChange, FinancialSummary, LedgerEntry, Period, OTHER_TYPE_ID};
pub use api::{entries_router, summary_router};
