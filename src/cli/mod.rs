//! CLI entry point
//!
//! Resolves settings from flags and the config file, builds the client and
//! runs the checklist.

use colored::Colorize;
use std::time::Duration;

use crate::api::{ApiClient, ClientOptions, ReqwestTransport};
use crate::commands::RunArgs;
use crate::common::config::Config;
use crate::common::{unix_timestamp, Error, Result};
use crate::runner::{Account, Report, RunSettings, Runner};

/// Everything needed to start a run
#[derive(Debug)]
pub struct Resolved {
    pub client: ClientOptions,
    pub timeout: Duration,
    pub run: RunSettings,
}

/// Merge flags over the config file
pub fn resolve(args: &RunArgs, config: Config, timestamp: u64) -> Result<Resolved> {
    let known_account = match (&args.username, &args.password) {
        (Some(username), Some(password)) => Some(Account::new(username, password)),
        (None, None) => config
            .account
            .map(|a| Account::new(a.username, a.password)),
        _ => {
            return Err(Error::Config(
                "--username and --password must be given together".to_string(),
            ))
        }
    };

    let timeout_secs = args.timeout.unwrap_or(config.server.timeout_secs);
    if timeout_secs == 0 {
        return Err(Error::Config("timeout must be at least 1 second".to_string()));
    }

    Ok(Resolved {
        client: ClientOptions {
            base_url: args
                .base_url
                .clone()
                .unwrap_or(config.server.base_url),
            bypass_rate_limit: !args.enable_rate_limit && config.server.bypass_rate_limit,
            fallback_retry_after: Duration::from_secs(config.retry.fallback_retry_after_secs),
        },
        timeout: Duration::from_secs(timeout_secs),
        run: RunSettings {
            known_account,
            new_account: Account::generated(timestamp, config.registration.password),
            new_password: config.registration.new_password,
        },
    })
}

/// Run the smoke test and return the process exit code
pub async fn run(args: RunArgs) -> Result<i32> {
    let config = Config::load(args.config.as_deref())?;
    let resolved = resolve(&args, config, unix_timestamp())?;

    tracing::debug!(
        base_url = %resolved.client.base_url,
        timeout_secs = resolved.timeout.as_secs(),
        bypass_rate_limit = resolved.client.bypass_rate_limit,
        known_account = resolved.run.known_account.is_some(),
        "Resolved settings"
    );

    let transport = ReqwestTransport::new(resolved.timeout)?;
    let api = ApiClient::new(transport, resolved.client)?;
    let mut runner = Runner::new(api, resolved.run, Report::new());

    Ok(runner.run().await.exit_code())
}

/// Process exit code for a finished run, printing a fatal error if any
pub fn exit_code(result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n{}", format!("Error: {e}").red());
            1
        }
    }
}
