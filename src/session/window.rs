use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use super::Session;
use crate::editor::{Segment, Surface};
use crate::models::Headers;

/// Something a window can be asked to do: repopulate itself or push its
/// edits back to the tracker.
#[async_trait::async_trait]
pub trait WindowAction: Send + Sync {
    async fn run(&self, session: &Arc<Session>, window: &Window) -> Result<()>;
}

/// What an issue window learned at its last refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueView {
    /// Tag command word to transition id.
    pub commands: HashMap<String, String>,
    pub status: String,
    pub headers: Headers,
}

pub enum WindowKind {
    Plain,
    IssueDetail(Mutex<IssueView>),
}

/// Kind and bound actions of a window, fixed when it is created.
pub struct Behavior {
    kind: WindowKind,
    refresh: Option<Arc<dyn WindowAction>>,
    commit: Option<Arc<dyn WindowAction>>,
}

impl Behavior {
    pub fn plain() -> Self {
        Self {
            kind: WindowKind::Plain,
            refresh: None,
            commit: None,
        }
    }

    pub fn issue() -> Self {
        Self {
            kind: WindowKind::IssueDetail(Mutex::new(IssueView::default())),
            refresh: None,
            commit: None,
        }
    }

    pub fn with_refresh(mut self, action: Arc<dyn WindowAction>) -> Self {
        self.refresh = Some(action);
        self
    }

    pub fn with_commit(mut self, action: Arc<dyn WindowAction>) -> Self {
        self.commit = Some(action);
        self
    }
}

/// A live acme window and the behavior bound to it.
pub struct Window {
    title: String,
    surface: Arc<dyn Surface>,
    kind: WindowKind,
    refresh: Option<Arc<dyn WindowAction>>,
    commit: Option<Arc<dyn WindowAction>>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("title", &self.title)
            .field("issue", &self.is_issue())
            .field("refresh", &self.refresh.is_some())
            .field("commit", &self.commit.is_some())
            .finish_non_exhaustive()
    }
}

impl Window {
    pub fn new(title: impl Into<String>, surface: Arc<dyn Surface>, behavior: Behavior) -> Self {
        Self {
            title: title.into(),
            surface,
            kind: behavior.kind,
            refresh: behavior.refresh,
            commit: behavior.commit,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn surface(&self) -> &Arc<dyn Surface> {
        &self.surface
    }

    pub fn is_issue(&self) -> bool {
        matches!(self.kind, WindowKind::IssueDetail(_))
    }

    /// Transition id bound to a tag command word, for issue windows.
    pub fn transition_for(&self, command: &str) -> Option<String> {
        match &self.kind {
            WindowKind::IssueDetail(view) => view
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .commands
                .get(command)
                .cloned(),
            WindowKind::Plain => None,
        }
    }

    pub fn issue_view(&self) -> Option<IssueView> {
        match &self.kind {
            WindowKind::IssueDetail(view) => {
                Some(view.lock().unwrap_or_else(PoisonError::into_inner).clone())
            }
            WindowKind::Plain => None,
        }
    }

    /// Replace the cached issue state. Plain windows ignore it.
    pub fn set_issue_view(&self, next: IssueView) {
        if let WindowKind::IssueDetail(view) = &self.kind {
            *view.lock().unwrap_or_else(PoisonError::into_inner) = next;
        }
    }

    /// Run the bound refresh action, if any.
    pub async fn refresh(&self, session: &Arc<Session>) -> Result<()> {
        match &self.refresh {
            Some(action) => action.run(session, self).await,
            None => Ok(()),
        }
    }

    /// Run the bound commit action, if any.
    pub async fn commit(&self, session: &Arc<Session>) -> Result<()> {
        match &self.commit {
            Some(action) => action.run(session, self).await,
            None => Ok(()),
        }
    }

    pub async fn body(&self) -> Result<String> {
        self.surface.read(Segment::Body).await
    }

    pub async fn tag(&self) -> Result<String> {
        self.surface.read(Segment::Tag).await
    }

    /// Replace the whole body and leave the window clean, scrolled to the top.
    pub async fn replace_body(&self, text: &str) -> Result<()> {
        self.surface.set_addr(",").await?;
        self.surface.write(Segment::Data, text).await?;
        self.surface.ctl("clean").await?;
        self.surface.set_addr("#0").await?;
        self.surface.ctl("dot=addr").await?;
        self.surface.ctl("show").await
    }

    /// Append to the body and scroll to the new end.
    pub async fn append(&self, text: &str) -> Result<()> {
        self.surface.write(Segment::Body, text).await?;
        self.surface.set_addr("$").await?;
        self.surface.ctl("dot=addr").await?;
        self.surface.ctl("show").await
    }

    pub async fn set_tag(&self, tag: &str) -> Result<()> {
        self.surface.ctl("cleartag").await?;
        self.surface.write(Segment::Tag, tag).await
    }

    pub async fn show(&self) -> Result<()> {
        self.surface.ctl("show").await
    }

    pub async fn close(&self) -> Result<()> {
        self.surface.ctl("delete").await
    }
}
