//! CLI argument definitions
//!
//! Flags override values from the config file, which override defaults.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Base URL of the API server (default: http://localhost:8080)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Request timeout in seconds (default: 30)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Honor server rate limits (do not send the bypass header)
    #[arg(long)]
    pub enable_rate_limit: bool,

    /// Existing account to log in with before registering a new one
    #[arg(long, env = "CUPID_USERNAME")]
    pub username: Option<String>,

    /// Password of the existing account
    #[arg(long, env = "CUPID_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Config file (default: platform config dir/cupid-smoke/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log every request to stderr
    #[arg(long, short)]
    pub verbose: bool,
}
