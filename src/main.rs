use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod editor;
mod models;
mod session;
#[cfg(test)]
mod testing;
mod tracker;
mod utils;

use cli::{Cli, Commands};

fn init_tracing(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let default = if cli.debug { "acme_jira=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli)?;

    match cli.command {
        Commands::Open(args) => commands::open::execute(args).await,
        Commands::Projects(args) => commands::projects::execute(args).await,
    }
}
