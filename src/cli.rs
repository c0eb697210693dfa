use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{open, projects};

#[derive(Parser)]
#[command(name = "acme-jira")]
#[command(about = "Browse and edit JIRA issues from acme windows")]
#[command(version)]
pub struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    pub debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the issue windows and serve them until the last one closes
    Open(open::Args),

    /// List the project keys the tracker knows
    Projects(projects::Args),
}
