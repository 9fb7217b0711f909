//! HTTP access to the Cupid API
//!
//! The client is transport-agnostic; production runs use reqwest, tests use
//! a scripted fake.

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::{ApiCall, ApiClient, ApiResponse, ClientOptions, API_PREFIX};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
