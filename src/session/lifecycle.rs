use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::actions::{ResetDraft, SubmitDraft, NEW_ISSUE_TAG};
use super::look::ProjectKeys;
use super::{dispatch, Behavior, RegistryError, Window, WindowRegistry};
use crate::config::Config;
use crate::editor::Editor;
use crate::tracker::{Tracker, TrackerError};
use crate::utils::join_path;

pub const ERRORS_TITLE: &str = "+Errors";
pub const NEW_ISSUE_TITLE: &str = "+New";

/// What a session needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Normalized path every window name is placed under.
    pub prefix: String,
    /// JQL behind the `my-issues` window.
    pub mine_query: String,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            prefix: config.window_prefix(),
            mine_query: config.queries.mine.clone(),
        }
    }
}

/// One run of the program: the open windows and what they talk to.
pub struct Session {
    prefix: String,
    mine_query: String,
    projects: ProjectKeys,
    registry: WindowRegistry,
    editor: Arc<dyn Editor>,
    tracker: Arc<dyn Tracker>,
}

impl Session {
    /// Snapshot the tracker's project keys and start an empty session.
    ///
    /// The key pattern is never rebuilt, so projects created later are not
    /// recognized until the next run.
    pub async fn new(
        options: SessionOptions,
        editor: Arc<dyn Editor>,
        tracker: Arc<dyn Tracker>,
    ) -> Result<Arc<Self>, TrackerError> {
        let keys = tracker.project_keys().await?;
        debug!("known projects: {:?}", keys);
        Ok(Arc::new(Self {
            prefix: options.prefix,
            mine_query: options.mine_query,
            projects: ProjectKeys::new(&keys),
            registry: WindowRegistry::new(),
            editor,
            tracker,
        }))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn mine_query(&self) -> &str {
        &self.mine_query
    }

    pub(crate) fn projects(&self) -> &ProjectKeys {
        &self.projects
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &dyn Tracker {
        self.tracker.as_ref()
    }

    /// Bring a window forward if it exists.
    pub(crate) async fn show(&self, title: &str) -> Option<Arc<Window>> {
        let window = self.registry.find(title)?;
        debug!("showing: {:?}", title);
        if let Err(e) = window.show().await {
            warn!("Failed to show {:?}: {:#}", title, e);
        }
        Some(window)
    }

    /// Create a surface named after `title`, register it and start its
    /// event loop.
    pub(crate) async fn open_window(
        self: &Arc<Self>,
        title: &str,
        behavior: Behavior,
    ) -> Result<Arc<Window>> {
        if self.registry.has_ended() {
            return Err(RegistryError::Closed(title.to_string()).into());
        }

        let surface = self
            .editor
            .new_surface()
            .await
            .with_context(|| format!("Failed to create window {:?}", title))?;
        debug!("spawning: {:?}", title);

        let setup = async {
            surface.set_name(&join_path(&self.prefix, title)).await?;
            surface.ctl("mark").await?;
            surface.ctl("clean").await?;
            surface.events().await
        };
        let events = match setup.await {
            Ok(events) => events,
            Err(e) => {
                let _ = surface.ctl("delete").await;
                return Err(e.context(format!("Failed to set up window {:?}", title)));
            }
        };

        let window = Arc::new(Window::new(title, surface, behavior));
        if let Err(e) = self.registry.create(window.clone()) {
            error!("{}", e);
            if let Err(close_err) = window.close().await {
                warn!("Failed to discard surplus window {:?}: {:#}", title, close_err);
            }
            return Err(e.into());
        }

        dispatch::spawn(self.clone(), window.clone(), events);
        Ok(window)
    }

    /// Show the window titled `title`, or open it with `behavior`. The flag
    /// is true when this call created the window.
    ///
    /// Two callers can both miss the lookup and race to open the same title.
    /// The loser's surface is discarded and it carries on with the winner's
    /// window.
    pub(crate) async fn show_or_open(
        self: &Arc<Self>,
        title: &str,
        behavior: Behavior,
    ) -> Result<(Arc<Window>, bool)> {
        if let Some(window) = self.show(title).await {
            return Ok((window, false));
        }
        let e = match self.open_window(title, behavior).await {
            Ok(window) => return Ok((window, true)),
            Err(e) => e,
        };
        let lost_race = matches!(
            e.downcast_ref::<RegistryError>(),
            Some(RegistryError::AlreadyExists(_))
        );
        if lost_race {
            if let Some(window) = self.show(title).await {
                return Ok((window, false));
            }
        }
        Err(e)
    }

    /// Append a message to the `+Errors` window, creating it on first use.
    pub async fn report(self: &Arc<Self>, message: &str) {
        let mut text = message.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        warn!("{}", text.trim_end());

        let window = match self.show_or_open(ERRORS_TITLE, Behavior::plain()).await {
            Ok((window, _)) => window,
            Err(e) => {
                error!("Cannot open {}: {:#}", ERRORS_TITLE, e);
                return;
            }
        };

        if let Err(e) = window.append(&text).await {
            error!("Cannot write to {}: {:#}", ERRORS_TITLE, e);
        }
    }

    /// Run a window's refresh action, reporting any failure.
    pub(crate) async fn refresh(self: &Arc<Self>, window: &Window) {
        if let Err(e) = window.refresh(self).await {
            self.report(&format!("{}: Get: {:#}", window.title(), e))
                .await;
        }
    }

    /// Run a window's commit action, reporting any failure.
    pub(crate) async fn commit(self: &Arc<Self>, window: &Window) {
        if let Err(e) = window.commit(self).await {
            self.report(&format!("{}: Put: {:#}", window.title(), e))
                .await;
        }
    }

    pub(crate) async fn transition_issue(self: &Arc<Self>, window: &Window, transition_id: &str) {
        debug!("transition: {:?} {:?}", window.title(), transition_id);
        if let Err(e) = self.tracker.transition(window.title(), transition_id).await {
            self.report(&format!(
                "{}: transition {}: {}",
                window.title(),
                transition_id,
                e
            ))
            .await;
        }
    }

    /// Show or open the issue-creation form.
    pub(crate) async fn create_issue(self: &Arc<Self>) {
        let behavior = Behavior::plain()
            .with_refresh(Arc::new(ResetDraft))
            .with_commit(Arc::new(SubmitDraft));
        let window = match self.show_or_open(NEW_ISSUE_TITLE, behavior).await {
            Ok((window, true)) => window,
            Ok((_, false)) => return,
            Err(e) => {
                self.report(&format!("New: {:#}", e)).await;
                return;
            }
        };
        if let Err(e) = window.set_tag(NEW_ISSUE_TAG).await {
            self.report(&format!("{}: {:#}", NEW_ISSUE_TITLE, e)).await;
        }
        self.refresh(&window).await;
    }

    /// Close every window and end the session.
    pub async fn leave(&self) {
        info!(
            "leaving, closing {} windows {:?}",
            self.registry.len(),
            self.registry.titles()
        );
        self.registry.drain_all().await;
    }

    /// Resolves once the last window is gone.
    pub async fn wait_closed(&self) {
        self.registry.wait_empty().await;
    }
}
