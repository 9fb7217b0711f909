//! API client
//!
//! Builds requests against the configured base URL, attaches the harness
//! headers and bearer token, and retries once on HTTP 429.

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::common::{Error, Result};

use super::transport::{HttpRequest, HttpResponse, Method, Transport};

/// Prefix of every API path
pub const API_PREFIX: &str = "/api/v1";

/// Header asking the server to exempt the harness from rate limiting
pub const BYPASS_HEADER: &str = "X-Test-Script";

/// Paths that must never carry a bearer token
const UNAUTHENTICATED_PATHS: [&str; 2] = ["/api/v1/auth/login", "/api/v1/auth/register"];

const USER_AGENT: &str = concat!("cupid-smoke/", env!("CARGO_PKG_VERSION"));

/// One API call: method, path, optional JSON body and query string
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
}

impl ApiCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Add a query parameter
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    fn allows_auth(&self) -> bool {
        !UNAUTHENTICATED_PATHS.contains(&self.path.as_str())
    }
}

/// Client options resolved from config and CLI flags
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub bypass_rate_limit: bool,
    /// Wait used when a 429 has no parsable Retry-After
    pub fallback_retry_after: Duration,
}

/// A response after any rate-limit retry
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub path: String,
    pub status: u16,
    /// Parsed JSON body, `Null` if the body was empty or not JSON
    pub body: serde_json::Value,
    /// Time spent on the call including any retry wait
    pub elapsed: Duration,
    /// Set when a 429 was retried after this delay
    pub retried_after: Option<Duration>,
}

impl ApiResponse {
    /// Top-level `success` flag of the body
    pub fn success(&self) -> bool {
        self.body
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Top-level `message` of the body
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(|v| v.as_str())
    }

    /// Deserialize the body into a payload type
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.body)
            .map_err(|e| Error::unexpected_response(&self.path, &e.to_string()))
    }
}

/// Client for the API under test
pub struct ApiClient<T> {
    transport: T,
    base: Url,
    base_url: String,
    bypass_rate_limit: bool,
    fallback_retry_after: Duration,
}

impl<T: Transport> ApiClient<T> {
    /// Create a client, validating the base URL
    pub fn new(transport: T, options: ClientOptions) -> Result<Self> {
        let invalid = || Error::InvalidBaseUrl(options.base_url.clone());
        let base = Url::parse(options.base_url.trim()).map_err(|_| invalid())?;
        let usable = matches!(base.scheme(), "http" | "https")
            && base.host_str().is_some_and(|host| !host.is_empty())
            && base.query().is_none()
            && base.fragment().is_none();
        if !usable {
            return Err(invalid());
        }

        let base_url = base.as_str().trim_end_matches('/').to_string();
        Ok(Self {
            transport,
            base,
            base_url,
            bypass_rate_limit: options.bypass_rate_limit,
            fallback_retry_after: options.fallback_retry_after,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the outgoing request for a call
    ///
    /// The token is attached unless the call targets login or register.
    pub fn build_request(&self, call: &ApiCall, token: Option<&str>) -> HttpRequest {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ];
        if self.bypass_rate_limit {
            headers.push((BYPASS_HEADER.to_string(), "true".to_string()));
        }
        if let Some(token) = token.filter(|_| call.allows_auth()) {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let mut url = self.base.clone();
        url.set_path(&format!(
            "{}{}",
            self.base.path().trim_end_matches('/'),
            call.path
        ));

        HttpRequest {
            method: call.method,
            url: url.to_string(),
            headers,
            query: call.query.clone(),
            body: call.body.clone(),
        }
    }

    /// Send a call, retrying exactly once on HTTP 429
    pub async fn send(&self, call: &ApiCall, token: Option<&str>) -> Result<ApiResponse> {
        let request = self.build_request(call, token);
        let started = Instant::now();

        let mut response = self.dispatch(&request).await?;
        let mut retried_after = None;

        if response.status == 429 {
            let delay = retry_delay(response.retry_after.as_deref(), self.fallback_retry_after);
            warn!(
                method = %request.method,
                path = %call.path,
                delay_secs = delay.as_secs(),
                "Rate limited, retrying once"
            );
            tokio::time::sleep(delay).await;
            retried_after = Some(delay);
            response = self.dispatch(&request).await?;
        }

        let elapsed = started.elapsed();
        debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Response received"
        );

        let body = if response.body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&response.body).unwrap_or_else(|e| {
                debug!(path = %call.path, error = %e, "Response body is not JSON");
                serde_json::Value::Null
            })
        };

        Ok(ApiResponse {
            path: call.path.clone(),
            status: response.status,
            body,
            elapsed,
            retried_after,
        })
    }

    async fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "Sending request");
        self.transport.send(request).await.map_err(|e| {
            warn!(method = %request.method, url = %request.url, error = %e, "Request failed");
            e
        })
    }
}

/// Delay before retrying a 429
///
/// Uses `Retry-After` in whole seconds, or the fallback when the header is
/// absent or not an integer.
pub fn retry_delay(retry_after: Option<&str>, fallback: Duration) -> Duration {
    retry_after
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}
