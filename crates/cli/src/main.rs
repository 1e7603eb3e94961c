#![forbid(unsafe_code)]

mod args;
mod commands;
mod response;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "GOALMAP_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = args::Cli::parse();

    let (envelope, code) = match commands::execute(cli) {
        Ok(envelope) => (envelope, ExitCode::SUCCESS),
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "command failed");
            (response::goal_error(&err), ExitCode::FAILURE)
        }
    };
    match serde_json::to_string_pretty(&envelope) {
        Ok(text) => println!("{text}"),
        Err(err) => {
            eprintln!("failed to encode response: {err}");
            return ExitCode::FAILURE;
        }
    }
    code
}
