//! Command-line entry point.

pub mod command;
pub mod output;
pub mod run;

use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;
use command::{CheckCommand, Cli, Commands};

/// Load configuration, initialize logging and dispatch the subcommand.
///
/// # Errors
/// Configuration, store and command failures.
pub async fn execute(cli: Cli) -> Result<()> {
    output::configure(output::OutputConfig {
        json: cli.json,
        quiet: cli.quiet,
    });

    let config = Config::load(&cli.config)?;

    if let Commands::Check(CheckCommand::Config) = cli.command {
        run::check_config(&config);
        return Ok(());
    }

    config.logging.init();
    let engine = bootstrap::build_engine(&config)?;

    match &cli.command {
        Commands::Serve(args) => run::serve(&config, engine, args).await,
        Commands::Scan(args) => run::scan(&engine, args).await,
        Commands::Suggest(args) => run::suggest(&engine, args).await,
        Commands::Ingest(args) => run::ingest(&engine, args).await,
        Commands::Check(_) => Ok(()),
    }
}
