//! Futsal League Admin CLI
//!
//! Round administration, player catalog, statistics entry with scoring and
//! lineup inspection against the league database.

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, CliHandler, Commands};
use league_service::{LeagueConfig, LeagueService, LoggingConfig};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Cli::parse();

    let log_config = LoggingConfig::from_env();
    logging::initialize_logging(&log_config.level, &log_config.format)?;

    // Previews are pure and must work without a database
    let command = match args.command {
        Commands::Preview { role, stats } => {
            return cli::show_preview(role, stats.into(), args.json);
        }
        command => command,
    };

    let config = LeagueConfig::from_env().context("Failed to load configuration")?;
    debug!(max_connections = config.database.max_connections, "Loaded configuration");

    let service = LeagueService::new(config).await.context("Failed to connect to league database")?;
    CliHandler::new(service, args.json).handle_command(command).await
}
