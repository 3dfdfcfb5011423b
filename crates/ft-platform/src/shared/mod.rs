//! Shared Module
//!
//! Cross-cutting concerns: errors, the request authentication pipeline,
//! ownership checks and common API types.

pub mod error;
pub mod middleware;
pub mod ownership;
pub mod api_common;

// APIs
pub mod health_api;

// Re-export commonly used items
pub use error::{PlatformError, Result};
pub use middleware::{AppState, AuthGate, Authenticated};
pub use ownership::{OwnedEntry, OwnershipGuard};
pub use api_common::{JsonBody, MessageResponse, QueryParams};
pub use health_api::health_router;
