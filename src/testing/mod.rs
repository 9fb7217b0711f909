//! Test support
//!
//! Provides a scripted transport so the runner can be exercised without a
//! live server.

mod fake;

pub use fake::FakeTransport;
