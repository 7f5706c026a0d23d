use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;

/// Live monitor for an ML prediction service
#[derive(Parser)]
#[command(name = "driftwatch", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend origin, overrides config file and environment
    #[arg(short, long, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "human")]
    pub output: crate::cli::output::OutputFormat,

    /// Metrics server port (0 disables it)
    #[arg(long, default_value_t = 0)]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Commands,
}
