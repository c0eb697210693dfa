mod jira;

use thiserror::Error;

use crate::models::{Issue, IssueDraft, IssueSummary, IssueUpdate};

pub use jira::JiraClient;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {path} returned HTTP {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid issue: {0}")]
    Invalid(String),
}

/// The issue tracker operations the windows need.
#[async_trait::async_trait]
pub trait Tracker: Send + Sync {
    async fn project_keys(&self) -> Result<Vec<String>, TrackerError>;

    /// Run a JQL query. Results keep the order the tracker returns.
    async fn search(&self, jql: &str) -> Result<Vec<IssueSummary>, TrackerError>;

    /// Full detail of one issue, with its currently legal transitions.
    async fn issue(&self, key: &str) -> Result<Issue, TrackerError>;

    async fn transition(&self, key: &str, transition_id: &str) -> Result<(), TrackerError>;

    async fn update(&self, key: &str, update: &IssueUpdate) -> Result<(), TrackerError>;

    async fn add_comment(&self, key: &str, body: &str) -> Result<(), TrackerError>;

    /// Create an issue and return its key.
    async fn create(&self, draft: &IssueDraft) -> Result<String, TrackerError>;
}
