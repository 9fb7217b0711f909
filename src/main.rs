//! Cupid API smoke test
//!
//! Runs a fixed checklist of requests against a live Cupid server and exits
//! non-zero if any of them failed.

use clap::Parser;
use colored::Colorize;
use cupid_smoke::{cli, common::logging, commands::RunArgs};

#[derive(Parser)]
#[command(name = "cupid-smoke", about = "End-to-end smoke test for the Cupid API")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    args: RunArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.args.verbose);

    let code = tokio::select! {
        result = cli::run(cli.args) => cli::exit_code(result),
        Ok(()) = tokio::signal::ctrl_c() => {
            println!("\n{}", "Test run interrupted".yellow());
            1
        }
    };

    std::process::exit(code);
}
