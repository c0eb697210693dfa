use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args as ClapArgs;
use tracing::info;

use crate::config::Config;
use crate::editor::AcmeEditor;
use crate::session::{Session, SessionOptions, MINE_TITLE};
use crate::tracker::JiraClient;

#[derive(ClapArgs)]
pub struct Args {
    /// Path under the namespace to place windows at (e.g. `work`)
    pub prefix: Option<String>,

    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Window to open first: an issue key or `my-issues`
    #[arg(long = "open", value_name = "REF")]
    pub open: Option<String>,
}

pub async fn execute(args: Args) -> Result<()> {
    let config = Config::load(args.config)?.with_prefix(args.prefix);

    let editor = AcmeEditor::from_config(&config.editor);
    if !editor.is_running().await {
        bail!(
            "acme is not running (no `{}` service found)",
            config.editor.service
        );
    }

    let tracker = JiraClient::from_config(&config.jira)?;
    let session = Session::new(
        SessionOptions::from_config(&config),
        Arc::new(editor),
        Arc::new(tracker),
    )
    .await
    .with_context(|| format!("Failed to list projects from {}", config.jira.url))?;

    let reference = args.open.as_deref().unwrap_or(MINE_TITLE);
    if !session.look(reference).await {
        session.report(&format!("{:?}: no such window", reference)).await;
    }
    if session.registry().is_empty() {
        bail!("No window could be opened under {}", session.prefix());
    }
    info!("serving windows under {}", session.prefix());

    tokio::select! {
        _ = session.wait_closed() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            session.leave().await;
            session.wait_closed().await;
        }
    }

    info!("all windows closed");
    Ok(())
}
