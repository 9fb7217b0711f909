//! Cupid API smoke test harness
//!
//! Exercises a running Cupid messaging server end-to-end: authentication,
//! profile, push tokens, presence, channels and messages.

pub mod api;
pub mod cli;
pub mod commands;
pub mod common;
pub mod runner;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use runner::{Report, Runner};
