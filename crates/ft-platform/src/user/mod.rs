//! User Aggregate

pub mod entity;
pub mod api;

pub use entity::{NewUser, Principal, User};
pub use api::users_router;
