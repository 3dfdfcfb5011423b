//! Fintrack Common
//!
//! Shared plumbing used by every Fintrack binary.

pub mod logging;

pub use logging::{init_logging, LogFormat};
