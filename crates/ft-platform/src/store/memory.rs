//! In-Memory Store
//!
//! Process-local binding of every storage trait, used in dev mode and by
//! tests. Uniqueness checks and inserts happen under one lock, so racing
//! writers observe the same outcomes as against the database constraints.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use super::{
    constraints, BudgetStore, LedgerStore, ResourceOwnerLookup, StoreError, StoreResult,
    UserLookup, UserStore,
};
use crate::budget::entity::{Budget, NewBudget};
use crate::ledger::entity::{
    DateRange, Direction, EntryChange, FinancialSummary, LedgerEntry, Period, TypeSummary,
    YearSummary,
};
use crate::user::entity::{NewUser, User};

/// Entry type names seeded by the schema migration, in id order.
pub const DEFAULT_ENTRY_TYPES: &[&str] = &[
    "Salary",
    "Food",
    "Transport",
    "Housing",
    "Utilities",
    "Entertainment",
    "Health",
    "Shopping",
    "Investment",
    "Other",
];

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, User>,
    entries: HashMap<i64, LedgerEntry>,
    budgets: HashMap<i64, Budget>,
    next_entry_id: i64,
    next_budget_id: i64,
    /// When set, every call fails with this backend message
    failure: Option<String>,
}

impl MemoryState {
    fn check(&self) -> StoreResult<()> {
        match &self.failure {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    /// Income and expense magnitudes of an owner's entries, grouped by `key`.
    fn totals_by<K, F>(&self, owner: &str, mut key: F) -> BTreeMap<K, (i64, i64)>
    where
        K: Ord,
        F: FnMut(&LedgerEntry) -> Option<K>,
    {
        let mut totals = BTreeMap::new();
        for entry in self.entries.values().filter(|e| e.owner == owner) {
            let Some(k) = key(entry) else { continue };
            let (income, expense) = totals.entry(k).or_insert((0i64, 0i64));
            match entry.direction {
                Direction::In => *income = income.saturating_add(entry.amount),
                Direction::Out => *expense = expense.saturating_add(entry.amount),
            }
        }
        totals
    }
}

fn type_name(type_id: i64) -> String {
    usize::try_from(type_id - 1)
        .ok()
        .and_then(|index| DEFAULT_ENTRY_TYPES.get(index))
        .unwrap_or(&"Other")
        .to_string()
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the backend were unreachable.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.state.lock().failure = Some(message.into());
    }

    pub fn recover(&self) {
        self.state.lock().failure = None;
    }

    /// Remove a user, leaving their entries and budgets behind.
    pub fn remove_user(&self, username: &str) -> Option<User> {
        self.state.lock().users.remove(username)
    }
}

#[async_trait]
impl UserLookup for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock();
        state.check()?;
        Ok(state.users.get(username).cloned())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state.lock();
        state.check()?;

        if state.users.contains_key(&user.username) {
            return Err(StoreError::unique(constraints::USERS_PKEY));
        }
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::unique(constraints::USERS_EMAIL));
        }

        let now = Utc::now();
        let record = User {
            username: user.username,
            name: user.name,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(record.username.clone(), record.clone());
        Ok(record)
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.check()?;

        if let Some(user) = state.users.get_mut(username) {
            user.password_hash = password_hash.to_string();
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceOwnerLookup for InMemoryStore {
    async fn find_owner(&self, resource_id: i64) -> StoreResult<Option<String>> {
        let state = self.state.lock();
        state.check()?;
        Ok(state.entries.get(&resource_id).map(|e| e.owner.clone()))
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn find_type_id(&self, type_name: &str) -> StoreResult<Option<i64>> {
        self.state.lock().check()?;
        Ok(DEFAULT_ENTRY_TYPES
            .iter()
            .position(|name| *name == type_name)
            .map(|index| index as i64 + 1))
    }

    async fn insert(&self, owner: &str, change: EntryChange) -> StoreResult<LedgerEntry> {
        let mut state = self.state.lock();
        state.check()?;

        state.next_entry_id += 1;
        let now = Utc::now();
        let entry = LedgerEntry {
            id: state.next_entry_id,
            owner: owner.to_string(),
            amount: change.amount,
            direction: change.direction,
            type_id: change.type_id,
            created_at: now,
            updated_at: now,
        };
        state.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<LedgerEntry>> {
        let state = self.state.lock();
        state.check()?;
        Ok(state.entries.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<LedgerEntry>> {
        let state = self.state.lock();
        state.check()?;

        let mut entries: Vec<LedgerEntry> = state
            .entries
            .values()
            .filter(|e| e.owner == owner)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn update(&self, id: i64, change: EntryChange) -> StoreResult<Option<LedgerEntry>> {
        let mut state = self.state.lock();
        state.check()?;

        Ok(state.entries.get_mut(&id).map(|entry| {
            entry.amount = change.amount;
            entry.direction = change.direction;
            entry.type_id = change.type_id;
            entry.updated_at = Utc::now();
            entry.clone()
        }))
    }

    async fn delete(&self, id: i64) -> StoreResult<Option<LedgerEntry>> {
        let mut state = self.state.lock();
        state.check()?;
        Ok(state.entries.remove(&id))
    }

    async fn summarize(&self, owner: &str, range: DateRange) -> StoreResult<Option<FinancialSummary>> {
        let state = self.state.lock();
        state.check()?;

        let mut found = false;
        let (mut income, mut expense) = (0i64, 0i64);
        for entry in state
            .entries
            .values()
            .filter(|e| e.owner == owner && range.contains(e.created_at))
        {
            found = true;
            match entry.direction {
                Direction::In => income = income.saturating_add(entry.amount),
                Direction::Out => expense = expense.saturating_add(entry.amount),
            }
        }

        Ok(found.then(|| FinancialSummary::new(income, expense)))
    }

    async fn summarize_each_year(&self, owner: &str) -> StoreResult<Vec<YearSummary>> {
        let state = self.state.lock();
        state.check()?;

        Ok(state
            .totals_by(owner, |e| Some(e.created_at.year()))
            .into_iter()
            .map(|(year, (income, expense))| YearSummary {
                year,
                summary: FinancialSummary::new(income, expense),
            })
            .collect())
    }

    async fn summarize_by_type(&self, owner: &str, range: DateRange) -> StoreResult<Vec<TypeSummary>> {
        let state = self.state.lock();
        state.check()?;

        Ok(state
            .totals_by(owner, |e| range.contains(e.created_at).then_some(e.type_id))
            .into_iter()
            .map(|(type_id, (income, expense))| TypeSummary {
                type_id,
                type_name: type_name(type_id),
                summary: FinancialSummary::new(income, expense),
            })
            .collect())
    }
}

#[async_trait]
impl BudgetStore for InMemoryStore {
    async fn insert(&self, budget: NewBudget) -> StoreResult<Budget> {
        let mut state = self.state.lock();
        state.check()?;

        let taken = state
            .budgets
            .values()
            .any(|b| b.owner == budget.owner && b.period() == budget.period);
        if taken {
            return Err(StoreError::unique(constraints::BUDGETS_PERIOD));
        }

        state.next_budget_id += 1;
        let record = Budget {
            id: state.next_budget_id,
            owner: budget.owner,
            month: budget.period.month,
            year: budget.period.year,
            amount: budget.amount,
            created_at: Utc::now(),
        };
        state.budgets.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find(&self, owner: &str, period: Period) -> StoreResult<Option<Budget>> {
        let state = self.state.lock();
        state.check()?;
        Ok(state
            .budgets
            .values()
            .find(|b| b.owner == owner && b.period() == period)
            .cloned())
    }

    async fn update_amount(&self, id: i64, amount: Decimal) -> StoreResult<Option<Budget>> {
        let mut state = self.state.lock();
        state.check()?;

        Ok(state.budgets.get_mut(&id).map(|budget| {
            budget.amount = amount;
            budget.clone()
        }))
    }

    async fn history(&self, owner: &str) -> StoreResult<Vec<Budget>> {
        let state = self.state.lock();
        state.check()?;

        let mut budgets: Vec<Budget> = state
            .budgets
            .values()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect();
        budgets.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        Ok(budgets)
    }

    async fn history_for_year(&self, owner: &str, year: i32) -> StoreResult<Vec<Budget>> {
        let mut budgets = self.history(owner).await?;
        budgets.retain(|b| b.year == year);
        Ok(budgets)
    }
}
