//! CLI argument definitions for sawmill-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Sawmill beats ingestion daemon.
///
/// Listens for beats/lumberjack protocol clients, decodes incoming
/// batches, and delivers them to the configured downstream sink.
#[derive(Parser, Debug)]
#[command(name = "sawmill-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to sawmill.toml configuration file.
    #[arg(short, long, default_value = "/etc/sawmill/sawmill.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
