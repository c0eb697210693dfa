mod headers;
mod issue;

pub use headers::{Headers, IssueBody};
pub use issue::{Comment, Issue, IssueDraft, IssueSummary, IssueUpdate, Transition};
