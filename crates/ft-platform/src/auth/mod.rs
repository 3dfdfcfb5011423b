//! Authentication
//!
//! Session token issuing/verification and password hashing.

pub mod token;
pub mod password_service;

pub use token::{JwtMaker, Payload, TokenMaker, MIN_SECRET_KEY_LEN};
pub use password_service::{Argon2Config, PasswordPolicy, PasswordService};
