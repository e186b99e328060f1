//! Forecaster CLI - Enrollment and growth forecaster
//!
//! Usage:
//!   forecaster forecast --org NAME --input sections.toml   Score and write a PDF report
//!   forecaster schema                                      List input fields
//!   forecaster serve --port 3000                           Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Forecast {
            org,
            input,
            output,
            format,
            no_compress,
            history,
        } => commands::cmd_forecast(
            &org,
            &input,
            output.as_deref(),
            &format,
            no_compress,
            history.as_deref(),
        )
        .map(|_| ()),
        Commands::Schema => commands::cmd_schema(),
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&host, port, no_auth).await,
    }
}
