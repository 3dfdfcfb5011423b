//! User and Principal

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Registered user record
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

/// The identity a request acts as, resolved from its session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub username: String,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self { username: user.username.clone() }
    }
}
