//! Lichen CLI - license and update management

use anyhow::Result;
use clap::Parser;
use lichen_cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Init { path } => commands::init::run(path.as_deref()),
        Commands::Check { kind } => {
            commands::check::run(cli.config.as_deref(), (*kind).map(Into::into))
        }
        Commands::License { action } => commands::license::run(cli.config.as_deref(), action),
    }
}
