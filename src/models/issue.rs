use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub key: String,
    pub issue_type: String,
    pub status: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

impl Transition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The word a user types or clicks in the tag to run this transition.
    ///
    /// Tag commands are whitespace separated, so inner whitespace is folded
    /// into single hyphens.
    pub fn command_label(&self) -> String {
        self.name.split_whitespace().collect::<Vec<_>>().join("-")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub created: Option<DateTime<Utc>>,
    pub body: String,
}

/// Full detail of a single issue, including the transitions that are legal
/// from its current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub issue_type: String,
    pub status: String,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// Field edits pushed back to the tracker. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueUpdate {
    pub summary: Option<String>,
    /// `Some("")` unassigns the issue.
    pub assignee: Option<String>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.assignee.is_none()
    }
}

/// A new issue as typed into the creation window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub project: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
}

impl IssueDraft {
    pub const DEFAULT_TYPE: &'static str = "Task";

    /// The blank form shown in the creation window.
    pub fn template() -> String {
        format!(
            "Project: \nType: {}\nSummary: \n\n",
            Self::DEFAULT_TYPE
        )
    }

    /// Read a filled-in creation form. Missing fields come back empty, except
    /// the type which falls back to the default.
    pub fn parse(body: &str) -> Self {
        let (fields, rest) = super::headers::split_header_block(body);
        let mut draft = IssueDraft {
            project: String::new(),
            issue_type: String::new(),
            summary: String::new(),
            description: rest.trim().to_string(),
        };
        for (name, value) in fields {
            match name.as_str() {
                "Project" => draft.project = value,
                "Type" => draft.issue_type = value,
                "Summary" => draft.summary = value,
                _ => {}
            }
        }
        if draft.issue_type.is_empty() {
            draft.issue_type = Self::DEFAULT_TYPE.to_string();
        }
        draft
    }
}
