use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use crate::config::Config;
use crate::tracker::{JiraClient, Tracker};

#[derive(ClapArgs)]
pub struct Args {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub async fn execute(args: Args) -> Result<()> {
    let config = Config::load(args.config)?;
    let tracker = JiraClient::from_config(&config.jira)?;

    let mut keys = tracker
        .project_keys()
        .await
        .with_context(|| format!("Failed to list projects from {}", config.jira.url))?;
    keys.sort();

    for key in keys {
        println!("{}", key);
    }
    Ok(())
}
