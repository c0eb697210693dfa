use chrono::{DateTime, Utc};

use super::{Issue, IssueUpdate};

const REPORTED_BY: &str = "Reported by";

/// The `Name: value` block rendered at the top of an issue window.
///
/// Only `Summary` and `Assignee` are editable; the rest are informational and
/// edits to them are ignored on commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    pub summary: String,
    pub issue_type: String,
    pub status: String,
    pub assignee: String,
    pub reporter: String,
    pub updated: String,
}

impl Headers {
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            summary: issue.summary.clone(),
            issue_type: issue.issue_type.clone(),
            status: issue.status.clone(),
            assignee: issue.assignee.clone().unwrap_or_default(),
            reporter: issue.reporter.clone().unwrap_or_default(),
            updated: format_time(issue.updated),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "Summary: {}\nType: {}\nStatus: {}\nAssignee: {}\nReporter: {}\nUpdated: {}\n",
            self.summary, self.issue_type, self.status, self.assignee, self.reporter, self.updated
        )
    }

    /// Parse the header block at the top of `body`. Unknown names are skipped.
    pub fn parse(body: &str) -> Self {
        let (fields, _) = split_header_block(body);
        let mut headers = Headers::default();
        for (name, value) in fields {
            match name.as_str() {
                "Summary" => headers.summary = value,
                "Type" => headers.issue_type = value,
                "Status" => headers.status = value,
                "Assignee" => headers.assignee = value,
                "Reporter" => headers.reporter = value,
                "Updated" => headers.updated = value,
                _ => {}
            }
        }
        headers
    }

    /// Editable fields of `edited` that differ from `self`.
    pub fn changes(&self, edited: &Headers) -> IssueUpdate {
        let mut update = IssueUpdate::default();
        if !edited.summary.is_empty() && edited.summary != self.summary {
            update.summary = Some(edited.summary.clone());
        }
        if edited.assignee != self.assignee {
            update.assignee = Some(edited.assignee.clone());
        }
        update
    }
}

/// Renders and re-reads the whole body of an issue window.
pub struct IssueBody;

impl IssueBody {
    pub fn render(issue: &Issue) -> String {
        let mut out = Headers::from_issue(issue).render();
        // Empty comment area between the headers and the report line.
        out.push_str("\n\n");
        out.push_str(&format!(
            "{} {} on {}\n\n",
            REPORTED_BY,
            issue.reporter.as_deref().unwrap_or("nobody"),
            format_time(issue.created)
        ));
        let description = issue.description.trim_end();
        if !description.is_empty() {
            out.push_str(description);
            out.push('\n');
        }
        for comment in &issue.comments {
            out.push_str(&format!(
                "\nComment by {} on {}:\n{}\n",
                comment.author,
                format_time(comment.created),
                comment.body.trim_end()
            ));
        }
        out
    }

    /// Text typed between the header block and the report line, trimmed and
    /// newline terminated, or empty when nothing was typed.
    pub fn comment(body: &str) -> String {
        let (_, rest) = split_header_block(body);
        let marker = format!("\n{}", REPORTED_BY);
        let padded = format!("\n{}", rest);
        let end = match padded.find(&marker) {
            Some(end) => end,
            None => {
                tracing::warn!("issue body has no '{}' line, ignoring comment area", REPORTED_BY);
                return String::new();
            }
        };
        let comment = padded[..end].trim();
        if comment.is_empty() {
            String::new()
        } else {
            format!("{}\n", comment)
        }
    }
}

/// Split `body` into its leading `Name: value` lines and the text after the
/// first blank line.
pub(crate) fn split_header_block(body: &str) -> (Vec<(String, String)>, &str) {
    let mut fields = Vec::new();
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim_end_matches('\n');
        if trimmed.trim().is_empty() {
            return (fields, &body[offset..]);
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            fields.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    (fields, "")
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
