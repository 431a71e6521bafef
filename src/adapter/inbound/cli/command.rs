//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cross-venue sports prediction market arbitrage engine
#[derive(Parser, Debug)]
#[command(name = "linesman")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Detect arbitrage over stored quotes
    Scan(ScanArgs),

    /// Suggest mapping candidates for unmapped markets
    Suggest(SuggestArgs),

    /// Pull markets (and optionally quotes) from a venue
    Ingest(IngestArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate the configuration file.
    Config,
}

#[derive(clap::Args, Debug, Default)]
pub struct ServeArgs {
    /// Override `server.host`
    #[arg(long)]
    pub host: Option<String>,

    /// Override `server.port`
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(clap::Args, Debug, Default)]
pub struct ScanArgs {
    /// Scan a single sports event
    #[arg(long)]
    pub event: Option<i64>,
}

#[derive(clap::Args, Debug, Default)]
pub struct SuggestArgs {
    /// Maximum markets to examine
    #[arg(long)]
    pub limit: Option<usize>,

    /// Stop starting new markets after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct IngestArgs {
    /// Venue id (`polymarket`, `kalshi`), or `all`
    pub venue: String,

    /// Also record current quotes
    #[arg(long)]
    pub quotes: bool,
}
