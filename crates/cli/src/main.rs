mod commands;
mod logging;

use clap::{Parser, Subcommand};
use commands::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "siquil")]
#[command(about = "Simple SQL migration tool for PostgreSQL", version)]
struct Cli {
    /// Configuration file (defaults to ./siquil.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage migrations
    Migration {
        #[command(subcommand)]
        migration_command: MigrationCommands,
    },

    /// Manage database
    #[command(visible_alias = "db")]
    Database {
        #[command(subcommand)]
        database_command: DatabaseCommands,
    },
}

#[derive(Subcommand)]
enum MigrationCommands {
    /// Generate a new migration
    Generate {
        /// Migration name
        name: String,
    },

    /// Run all pending migrations
    Run,

    /// Revert the last migration
    Revert,

    /// Show migration status
    Status,
}

#[derive(Subcommand)]
enum DatabaseCommands {
    /// Setup database and run pending migrations
    Setup,

    /// Drop all tables and run all migrations
    Reset,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_file = dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {}", error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Migration { migration_command } => match migration_command {
            MigrationCommands::Generate { name } => {
                migration::generate(&config, &name).await?;
            }
            MigrationCommands::Run => {
                migration::run(&config).await?;
            }
            MigrationCommands::Revert => {
                migration::revert(&config).await?;
            }
            MigrationCommands::Status => {
                migration::status(&config).await?;
            }
        },
        Commands::Database { database_command } => match database_command {
            DatabaseCommands::Setup => {
                database::setup(&config).await?;
            }
            DatabaseCommands::Reset => {
                database::reset(&config).await?;
            }
        },
    }

    Ok(())
}
