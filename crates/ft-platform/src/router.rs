//! HTTP Router
//!
//! Assembles every aggregate's routes into one application router.

use axum::Router;

use crate::budget::api::budgets_router;
use crate::ledger::api::{entries_router, summary_router};
use crate::shared::health_api::{health_router, HealthState};
use crate::shared::middleware::AppState;
use crate::user::api::users_router;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(users_router())
        .merge(entries_router())
        .merge(summary_router())
        .merge(budgets_router())
        .merge(health_router::<AppState>(HealthState::new(env!("CARGO_PKG_VERSION"))))
        .with_state(state)
}
