use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Tracker, TrackerError};
use crate::config::JiraConfig;
use crate::models::{Comment, Issue, IssueDraft, IssueSummary, IssueUpdate, Transition};
use crate::utils::truncate_str;

const API: &str = "rest/api/2";
const SEARCH_FIELDS: &str = "summary,issuetype,status";
const ISSUE_FIELDS: &str =
    "summary,issuetype,status,assignee,reporter,created,updated,description,comment";
const SEARCH_LIMIT: u32 = 200;
const ERROR_BODY_LIMIT: usize = 300;

/// JIRA REST v2 client using basic auth.
#[derive(Clone)]
pub struct JiraClient {
    base_url: String,
    username: String,
    token: String,
    client: reqwest::Client,
}

impl fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl JiraClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("acme-jira/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            token: token.into(),
            client,
        })
    }

    pub fn from_config(config: &JiraConfig) -> anyhow::Result<Self> {
        let token = config.token()?;
        Ok(Self::new(&config.url, &config.username, token)?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .basic_auth(&self.username, Some(&self.token))
            .header("Accept", "application/json")
    }

    /// Send and return the body of a successful response.
    async fn send(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<String, TrackerError> {
        tracing::debug!("jira: {} {}", method, path);
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TrackerError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                body: truncate_str(body.trim(), ERROR_BODY_LIMIT),
            });
        }
        Ok(body)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TrackerError> {
        let body = self
            .send("GET", path, self.request(Method::GET, path).query(query))
            .await?;
        decode(path, &body)
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, TrackerError> {
    serde_json::from_str(body).map_err(|source| TrackerError::Decode {
        path: path.to_string(),
        source,
    })
}

#[async_trait::async_trait]
impl Tracker for JiraClient {
    async fn project_keys(&self) -> Result<Vec<String>, TrackerError> {
        let projects: Vec<WireProject> = self.get("project", &[]).await?;
        Ok(projects.into_iter().map(|p| p.key).collect())
    }

    async fn search(&self, jql: &str) -> Result<Vec<IssueSummary>, TrackerError> {
        let result: WireSearch = self
            .get(
                "search",
                &[
                    ("jql", jql.to_string()),
                    ("fields", SEARCH_FIELDS.to_string()),
                    ("maxResults", SEARCH_LIMIT.to_string()),
                ],
            )
            .await?;
        Ok(result.issues.into_iter().map(WireIssue::into_summary).collect())
    }

    async fn issue(&self, key: &str) -> Result<Issue, TrackerError> {
        let path = format!("issue/{}", key);
        let issue: WireIssue = self
            .get(
                &path,
                &[
                    ("expand", "transitions".to_string()),
                    ("fields", ISSUE_FIELDS.to_string()),
                ],
            )
            .await?;
        Ok(issue.into_issue())
    }

    async fn transition(&self, key: &str, transition_id: &str) -> Result<(), TrackerError> {
        let path = format!("issue/{}/transitions", key);
        let body = json!({ "transition": { "id": transition_id } });
        self.send("POST", &path, self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn update(&self, key: &str, update: &IssueUpdate) -> Result<(), TrackerError> {
        if update.is_empty() {
            return Ok(());
        }
        let path = format!("issue/{}", key);
        let body = update_body(update);
        self.send("PUT", &path, self.request(Method::PUT, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<(), TrackerError> {
        let path = format!("issue/{}/comment", key);
        self.send(
            "POST",
            &path,
            self.request(Method::POST, &path).json(&json!({ "body": body })),
        )
        .await?;
        Ok(())
    }

    async fn create(&self, draft: &IssueDraft) -> Result<String, TrackerError> {
        let path = "issue";
        let body = self
            .send(
                "POST",
                path,
                self.request(Method::POST, path).json(&create_body(draft)),
            )
            .await?;
        let created: WireCreated = decode(path, &body)?;
        Ok(created.key)
    }
}

fn update_body(update: &IssueUpdate) -> Value {
    let mut fields = serde_json::Map::new();
    if let Some(summary) = &update.summary {
        fields.insert("summary".to_string(), json!(summary));
    }
    if let Some(assignee) = &update.assignee {
        let value = if assignee.is_empty() {
            Value::Null
        } else {
            json!({ "name": assignee })
        };
        fields.insert("assignee".to_string(), value);
    }
    json!({ "fields": fields })
}

fn create_body(draft: &IssueDraft) -> Value {
    json!({
        "fields": {
            "project": { "key": draft.project },
            "issuetype": { "name": draft.issue_type },
            "summary": draft.summary,
            "description": draft.description,
        }
    })
}

/// JIRA timestamps look like `2024-03-01T09:30:00.000+0000`.
fn parse_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| tracing::debug!("unparseable jira time {:?}: {}", raw, e))
        .ok()
}

#[derive(Debug, Deserialize)]
struct WireProject {
    key: String,
}

#[derive(Debug, Deserialize)]
struct WireSearch {
    #[serde(default)]
    issues: Vec<WireIssue>,
}

#[derive(Debug, Deserialize)]
struct WireCreated {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireNamed {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl WireUser {
    fn label(self) -> Option<String> {
        self.name.or(self.display_name)
    }
}

#[derive(Debug, Deserialize)]
struct WireComment {
    author: Option<WireUser>,
    #[serde(default)]
    body: String,
    created: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireComments {
    #[serde(default)]
    comments: Vec<WireComment>,
}

#[derive(Debug, Default, Deserialize)]
struct WireFields {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    issuetype: WireNamed,
    #[serde(default)]
    status: WireNamed,
    assignee: Option<WireUser>,
    reporter: Option<WireUser>,
    created: Option<String>,
    updated: Option<String>,
    description: Option<String>,
    comment: Option<WireComments>,
}

#[derive(Debug, Deserialize)]
struct WireTransition {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireIssue {
    key: String,
    #[serde(default)]
    fields: WireFields,
    #[serde(default)]
    transitions: Vec<WireTransition>,
}

impl WireIssue {
    fn into_summary(self) -> IssueSummary {
        IssueSummary {
            key: self.key,
            issue_type: self.fields.issuetype.name,
            status: self.fields.status.name,
            summary: self.fields.summary,
        }
    }

    fn into_issue(self) -> Issue {
        let fields = self.fields;
        Issue {
            key: self.key,
            summary: fields.summary,
            issue_type: fields.issuetype.name,
            status: fields.status.name,
            assignee: fields.assignee.and_then(WireUser::label),
            reporter: fields.reporter.and_then(WireUser::label),
            created: parse_time(fields.created.as_deref()),
            updated: parse_time(fields.updated.as_deref()),
            description: fields.description.unwrap_or_default(),
            comments: fields
                .comment
                .unwrap_or_default()
                .comments
                .into_iter()
                .map(|c| Comment {
                    author: c
                        .author
                        .and_then(WireUser::label)
                        .unwrap_or_else(|| "unknown".to_string()),
                    created: parse_time(c.created.as_deref()),
                    body: c.body,
                })
                .collect(),
            transitions: self
                .transitions
                .into_iter()
                .map(|t| Transition::new(t.id, t.name))
                .collect(),
        }
    }
}
