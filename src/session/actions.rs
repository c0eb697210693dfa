use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::render::issue_table;
use super::{IssueView, Session, Window, WindowAction};
use crate::models::{Headers, IssueBody, IssueDraft};
use crate::tracker::TrackerError;

pub const MINE_TAG: &str = " Get New Search ";
pub const ISSUE_TAG: &str = " Get Put New Search ";
pub const NEW_ISSUE_TAG: &str = " Get Put ";

/// Tag of a freshly loaded issue window: the fixed commands, then one word
/// per legal transition.
pub fn issue_tag(labels: &[String]) -> String {
    if labels.is_empty() {
        ISSUE_TAG.to_string()
    } else {
        format!("{}| {} ", ISSUE_TAG, labels.join(" "))
    }
}

/// Fills the `my-issues` window from a JQL query.
pub struct RefreshMine {
    query: String,
}

impl RefreshMine {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

#[async_trait::async_trait]
impl WindowAction for RefreshMine {
    async fn run(&self, session: &Arc<Session>, window: &Window) -> Result<()> {
        let issues = session.tracker().search(&self.query).await?;
        debug!("{}: {} issues", window.title(), issues.len());
        window.replace_body(&issue_table(&issues)).await
    }
}

/// Reloads an issue window and rebuilds its command table.
pub struct RefreshIssue;

#[async_trait::async_trait]
impl WindowAction for RefreshIssue {
    async fn run(&self, session: &Arc<Session>, window: &Window) -> Result<()> {
        let issue = session.tracker().issue(window.title()).await?;

        let mut view = IssueView {
            status: issue.status.clone(),
            headers: Headers::from_issue(&issue),
            ..Default::default()
        };
        let mut labels = Vec::with_capacity(issue.transitions.len());
        for transition in &issue.transitions {
            let label = transition.command_label();
            view.commands.insert(label.clone(), transition.id.clone());
            labels.push(label);
        }

        window.replace_body(&IssueBody::render(&issue)).await?;
        window.set_tag(&issue_tag(&labels)).await?;
        window.set_issue_view(view);
        Ok(())
    }
}

/// Pushes header edits and the typed comment of an issue window.
pub struct CommitIssue;

#[async_trait::async_trait]
impl WindowAction for CommitIssue {
    async fn run(&self, session: &Arc<Session>, window: &Window) -> Result<()> {
        let key = window.title();
        let view = window
            .issue_view()
            .with_context(|| format!("{} is not an issue window", key))?;
        if view.headers == Headers::default() {
            anyhow::bail!("{} has not been loaded yet, run Get first", key);
        }

        let body = window.body().await?;
        let update = view.headers.changes(&Headers::parse(&body));
        let comment = IssueBody::comment(&body);

        if update.is_empty() && comment.is_empty() {
            debug!("{}: nothing to put", key);
            return Ok(());
        }
        if !update.is_empty() {
            debug!("{}: updating {:?}", key, update);
            session.tracker().update(key, &update).await?;
        }
        if !comment.is_empty() {
            session.tracker().add_comment(key, &comment).await?;
        }
        Ok(())
    }
}

/// Puts the blank creation form back.
pub struct ResetDraft;

#[async_trait::async_trait]
impl WindowAction for ResetDraft {
    async fn run(&self, _session: &Arc<Session>, window: &Window) -> Result<()> {
        window.replace_body(&IssueDraft::template()).await
    }
}

/// Creates an issue from the form and opens it.
pub struct SubmitDraft;

#[async_trait::async_trait]
impl WindowAction for SubmitDraft {
    async fn run(&self, session: &Arc<Session>, window: &Window) -> Result<()> {
        let draft = IssueDraft::parse(&window.body().await?);
        if !session.projects().contains_project(&draft.project) {
            return Err(TrackerError::Invalid(format!(
                "unknown project {:?}",
                draft.project
            ))
            .into());
        }
        if draft.summary.is_empty() {
            return Err(TrackerError::Invalid("summary is empty".to_string()).into());
        }

        let key = session.tracker().create(&draft).await?;
        info!("created {}", key);
        session.look(&key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Behavior;
    use crate::testing::{self, MockSurface, MockTracker};

    fn issue_window(surface: &Arc<MockSurface>) -> Window {
        Window::new(
            "PROJ-1",
            surface.clone(),
            Behavior::issue()
                .with_refresh(Arc::new(RefreshIssue))
                .with_commit(Arc::new(CommitIssue)),
        )
    }

    #[test]
    fn issue_tag_lists_transitions_after_bar() {
        assert_eq!(issue_tag(&[]), " Get Put New Search ");
        assert_eq!(
            issue_tag(&["Start-Progress".to_string(), "Resolve".to_string()]),
            " Get Put New Search | Start-Progress Resolve "
        );
    }

    #[tokio::test]
    async fn refresh_issue_renders_body_tag_and_commands() {
        let tracker = MockTracker::new().with_issue(testing::issue("PROJ-1"));
        let t = testing::session(tracker).await;
        let surface = Arc::new(MockSurface::new());
        let window = issue_window(&surface);

        window.refresh(&t.session).await.unwrap();

        assert!(surface.body().starts_with("Summary: Fix the build\n"));
        assert!(surface.body().contains("Reported by Ann on "));
        assert_eq!(surface.tag(), " Get Put New Search | Start-Progress Resolve ");
        assert_eq!(window.transition_for("Start-Progress").as_deref(), Some("21"));
        assert_eq!(window.transition_for("Resolve").as_deref(), Some("31"));
        assert_eq!(window.issue_view().unwrap().status, "Open");
        assert!(!surface.is_dirty());
    }

    #[tokio::test]
    async fn refresh_issue_failure_leaves_window_unchanged() {
        let t = testing::session(MockTracker::new()).await;
        let surface = Arc::new(MockSurface::new());
        surface.set_body("keep me");
        let window = issue_window(&surface);

        assert!(window.refresh(&t.session).await.is_err());
        assert_eq!(surface.body(), "keep me");
        assert!(window.issue_view().unwrap().commands.is_empty());
    }

    #[tokio::test]
    async fn commit_unchanged_issue_calls_nothing() {
        let tracker = MockTracker::new().with_issue(testing::issue("PROJ-1"));
        let t = testing::session(tracker).await;
        let surface = Arc::new(MockSurface::new());
        let window = issue_window(&surface);
        window.refresh(&t.session).await.unwrap();

        window.commit(&t.session).await.unwrap();
        assert_eq!(t.tracker.calls(), vec!["projects", "issue PROJ-1"]);
    }

    #[tokio::test]
    async fn commit_pushes_edited_headers_and_comment() {
        let tracker = MockTracker::new().with_issue(testing::issue("PROJ-1"));
        let t = testing::session(tracker).await;
        let surface = Arc::new(MockSurface::new());
        let window = issue_window(&surface);
        window.refresh(&t.session).await.unwrap();

        let edited = surface
            .body()
            .replacen("Summary: Fix the build", "Summary: Fix the release build", 1)
            .replacen("Assignee: Bob", "Assignee: ", 1)
            .replacen("\n\n\nReported by", "\n\nlooks good\n\nReported by", 1);
        surface.set_body(&edited);

        window.commit(&t.session).await.unwrap();

        assert_eq!(
            t.tracker.calls(),
            vec!["projects", "issue PROJ-1", "update PROJ-1", "comment PROJ-1"]
        );
        let update = t.tracker.last_update().unwrap();
        assert_eq!(update.summary.as_deref(), Some("Fix the release build"));
        assert_eq!(update.assignee.as_deref(), Some(""), "blank assignee unassigns");
        assert_eq!(t.tracker.comments(), vec!["looks good\n".to_string()]);
    }

    #[tokio::test]
    async fn commit_before_first_load_is_refused() {
        let t = testing::session(MockTracker::new()).await;
        let surface = Arc::new(MockSurface::new());
        let window = issue_window(&surface);
        assert!(window.commit(&t.session).await.is_err());
        assert_eq!(t.tracker.calls(), vec!["projects"]);
    }

    #[tokio::test]
    async fn refresh_mine_lists_search_results() {
        let tracker = MockTracker::new().with_search(testing::two_summaries());
        let t = testing::session(tracker).await;
        let surface = Arc::new(MockSurface::new());
        let window = Window::new(
            "my-issues",
            surface.clone(),
            Behavior::plain().with_refresh(Arc::new(RefreshMine::new("assignee = me"))),
        );

        window.refresh(&t.session).await.unwrap();
        assert_eq!(surface.body().lines().count(), 2);
        assert_eq!(t.tracker.searches(), vec!["assignee = me".to_string()]);
    }

    #[tokio::test]
    async fn submit_draft_validates_before_creating() {
        let t = testing::session(MockTracker::new()).await;
        let surface = Arc::new(MockSurface::new());
        let window = Window::new("+New", surface.clone(), Behavior::plain());

        surface.set_body("Project: XYZ\nType: Bug\nSummary: crash\n\n");
        let err = SubmitDraft.run(&t.session, &window).await.unwrap_err();
        assert!(err.to_string().contains("unknown project"));

        surface.set_body("Project: PROJ\nType: Bug\nSummary: \n\n");
        let err = SubmitDraft.run(&t.session, &window).await.unwrap_err();
        assert!(err.to_string().contains("summary is empty"));

        assert_eq!(t.tracker.calls(), vec!["projects"], "nothing is created");
    }

    #[tokio::test]
    async fn submit_draft_creates_and_opens_issue() {
        let tracker = MockTracker::new()
            .with_created("PROJ-7")
            .with_issue(testing::issue("PROJ-7"));
        let t = testing::session(tracker).await;
        let surface = Arc::new(MockSurface::new());
        let window = Window::new("+New", surface.clone(), Behavior::plain());
        surface.set_body("Project: PROJ\nType: Bug\nSummary: crash on start\n\nsteps\n");

        SubmitDraft.run(&t.session, &window).await.unwrap();

        let created = t.tracker.last_draft().unwrap();
        assert_eq!(created.project, "PROJ");
        assert_eq!(created.issue_type, "Bug");
        assert_eq!(created.summary, "crash on start");
        assert_eq!(created.description, "steps");
        assert!(t.session.registry().find("PROJ-7").is_some());
        assert_eq!(t.tracker.calls(), vec!["projects", "create", "issue PROJ-7"]);
    }

    #[tokio::test]
    async fn reset_draft_writes_template() {
        let t = testing::session(MockTracker::new()).await;
        let surface = Arc::new(MockSurface::new());
        surface.set_body("Project: PROJ\n");
        let window = Window::new("+New", surface.clone(), Behavior::plain());
        ResetDraft.run(&t.session, &window).await.unwrap();
        assert_eq!(surface.body(), IssueDraft::template());
    }
}
