use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use super::actions::{CommitIssue, RefreshIssue, RefreshMine, ISSUE_TAG, MINE_TAG};
use super::{Behavior, Session};

pub const MINE_TITLE: &str = "my-issues";
const MINE_ALIASES: &[&str] = &[MINE_TITLE, "mine", "Mine", "", "/"];
const UNIMPLEMENTED: &[&str] = &["Projects", "Issues", "Search"];

/// Recognizes `<PROJECT>-<digits>` for a fixed set of project keys.
pub struct ProjectKeys {
    keys: HashSet<String>,
    pattern: Option<Regex>,
}

impl ProjectKeys {
    pub fn new(keys: &[String]) -> Self {
        let alternatives: Vec<String> = keys.iter().map(|k| regex::escape(k)).collect();
        let pattern = if alternatives.is_empty() {
            None
        } else {
            let source = format!("^(?:{})-[0-9]+", alternatives.join("|"));
            match Regex::new(&source) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Cannot build issue key pattern: {}", e);
                    None
                }
            }
        };
        Self {
            keys: keys.iter().cloned().collect(),
            pattern,
        }
    }

    /// The issue key `text` starts with, if any.
    pub fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.pattern
            .as_ref()
            .and_then(|re| re.find(text))
            .map(|m| m.as_str())
    }

    pub fn contains_project(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

impl Session {
    /// Show-or-create the window a reference names. Returns whether the
    /// reference meant something to this session.
    pub async fn look(self: &Arc<Self>, reference: &str) -> bool {
        let title = self.strip_prefix(reference);
        debug!("looking: {:?}", title);

        if MINE_ALIASES.contains(&title) {
            self.show_or_create_mine().await;
            return true;
        }

        if UNIMPLEMENTED.contains(&title) {
            self.report(&format!("{:?} not implemented yet", title))
                .await;
            return true;
        }

        if let Some(key) = self.projects().find(title) {
            self.show_or_create_issue(key).await;
            return true;
        }

        false
    }

    fn strip_prefix<'a>(&self, reference: &'a str) -> &'a str {
        let prefix = self.prefix();
        match reference.strip_prefix(prefix) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/') => {
                rest.trim_start_matches('/')
            }
            _ => reference,
        }
    }

    async fn show_or_create_mine(self: &Arc<Self>) {
        let behavior = Behavior::plain()
            .with_refresh(Arc::new(RefreshMine::new(self.mine_query())));
        let window = match self.show_or_open(MINE_TITLE, behavior).await {
            Ok((window, true)) => window,
            Ok((_, false)) => return,
            Err(e) => {
                self.report(&format!("{}: {:#}", MINE_TITLE, e)).await;
                return;
            }
        };
        if let Err(e) = window.set_tag(MINE_TAG).await {
            self.report(&format!("{}: {:#}", MINE_TITLE, e)).await;
        }
        self.refresh(&window).await;
    }

    async fn show_or_create_issue(self: &Arc<Self>, key: &str) {
        let behavior = Behavior::issue()
            .with_refresh(Arc::new(RefreshIssue))
            .with_commit(Arc::new(CommitIssue));
        let window = match self.show_or_open(key, behavior).await {
            Ok((window, true)) => window,
            Ok((_, false)) => return,
            Err(e) => {
                self.report(&format!("{}: {:#}", key, e)).await;
                return;
            }
        };
        if let Err(e) = window.set_tag(ISSUE_TAG).await {
            self.report(&format!("{}: {:#}", key, e)).await;
        }
        self.refresh(&window).await;
    }
}
