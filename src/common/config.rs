//! Configuration file handling

use serde::Deserialize;
use std::path::Path;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Server under test
    #[serde(default)]
    pub server: ServerConfig,

    /// Known account to try before registering a new one
    #[serde(default)]
    pub account: Option<AccountConfig>,

    /// Passwords used for the generated account
    #[serde(default)]
    pub registration: RegistrationConfig,

    /// Rate-limit retry settings
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Server connection settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the API, without the `/api/v1` prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Send the rate-limit bypass header on every request
    #[serde(default = "default_bypass")]
    pub bypass_rate_limit: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            bypass_rate_limit: default_bypass(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_bypass() -> bool {
    true
}

/// Credentials of a pre-existing account
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
}

/// Passwords for the freshly registered account and the password change
#[derive(Debug, Deserialize)]
pub struct RegistrationConfig {
    /// Password given to `auth/register`
    #[serde(default = "default_register_password")]
    pub password: String,

    /// Password set by the change-password step
    #[serde(default = "default_new_password")]
    pub new_password: String,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            password: default_register_password(),
            new_password: default_new_password(),
        }
    }
}

fn default_register_password() -> String {
    "test123456".to_string()
}
fn default_new_password() -> String {
    "newtest123456".to_string()
}

/// Retry settings in seconds
#[derive(Debug, Deserialize)]
pub struct RetryConfig {
    /// Wait used when a 429 carries no usable Retry-After header
    #[serde(default = "default_fallback_retry_after")]
    pub fallback_retry_after_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            fallback_retry_after_secs: default_fallback_retry_after(),
        }
    }
}

fn default_fallback_retry_after() -> u64 {
    2
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default config file is
    /// read if present and defaults are returned otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse config text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}
