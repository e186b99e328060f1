//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Forecaster - Enrollment and growth forecasting for schools
#[derive(Parser)]
#[command(name = "forecaster")]
#[command(about = "Enrollment and growth forecaster with PDF reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score an organization from a section file and write the report
    Forecast {
        /// Organization name shown on the report
        #[arg(long)]
        org: String,

        /// Section file (.json or .toml) with keys A-D or "Section A"-"Section D"
        #[arg(short, long)]
        input: PathBuf,

        /// Report output path (defaults to Forecaster_Report_<org>.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format: pdf, json
        #[arg(short, long, default_value = "pdf")]
        format: String,

        /// Write PDF content streams uncompressed
        #[arg(long)]
        no_compress: bool,

        /// Enrollment history file to attach (.csv or .xlsx)
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Show all input fields with their bounds and defaults
    Schema,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable the activation key gate (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default every API request must carry the key from
        /// FORECASTER_ACTIVATION_KEY.
        #[arg(long)]
        no_auth: bool,
    },
}
