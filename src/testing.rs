//! In-memory editor and tracker doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;

use crate::editor::{Editor, Event, Segment, Surface};
use crate::models::{Issue, IssueDraft, IssueSummary, IssueUpdate, Transition};
use crate::session::{Session, SessionOptions};
use crate::tracker::{Tracker, TrackerError};

#[derive(Default)]
struct SurfaceState {
    name: String,
    body: String,
    tag: String,
    addr: (usize, usize),
    dirty: bool,
    deleted: bool,
    ops: Vec<String>,
    written: Vec<Event>,
}

/// A window that keeps its text in memory and records every call.
pub struct MockSurface {
    state: Mutex<SurfaceState>,
    tx: Mutex<Option<mpsc::Sender<Event>>>,
    rx: Mutex<Option<mpsc::Receiver<Event>>>,
}

impl MockSurface {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(32);
        Self {
            state: Mutex::new(SurfaceState::default()),
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    pub fn name(&self) -> String {
        self.state.lock().unwrap().name.clone()
    }

    pub fn set_body(&self, body: &str) {
        self.state.lock().unwrap().body = body.to_string();
    }

    pub fn body(&self) -> String {
        self.state.lock().unwrap().body.clone()
    }

    pub fn tag(&self) -> String {
        self.state.lock().unwrap().tag.clone()
    }

    pub fn ops(&self) -> Vec<String> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().unwrap().dirty
    }

    pub fn is_deleted(&self) -> bool {
        self.state.lock().unwrap().deleted
    }

    pub fn written_events(&self) -> Vec<Event> {
        self.state.lock().unwrap().written.clone()
    }

    pub async fn send_event(&self, event: Event) {
        let tx = self.tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            tx.send(event).await.unwrap();
        }
    }

    /// Simulate the user closing the window.
    pub fn close_events(&self) {
        self.tx.lock().unwrap().take();
    }

    fn resolve(&self, addr: &str, len: usize) -> Result<(usize, usize)> {
        let point = |s: &str| -> Result<usize> {
            match s {
                "$" => Ok(len),
                _ => {
                    let n: usize = s.trim_start_matches('#').parse()?;
                    if n > len {
                        bail!("address {} out of range", s);
                    }
                    Ok(n)
                }
            }
        };
        match addr {
            "," => Ok((0, len)),
            _ => match addr.split_once(',') {
                Some((a, b)) => Ok((point(a)?, point(b)?)),
                None => {
                    let p = point(addr)?;
                    Ok((p, p))
                }
            },
        }
    }
}

fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

#[async_trait::async_trait]
impl Surface for MockSurface {
    async fn set_name(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.name = name.to_string();
        state.ops.push(format!("name {}", name));
        Ok(())
    }

    async fn set_addr(&self, addr: &str) -> Result<()> {
        let len = self.state.lock().unwrap().body.chars().count();
        let range = self.resolve(addr, len)?;
        let mut state = self.state.lock().unwrap();
        state.addr = range;
        state.ops.push(format!("addr {}", addr));
        Ok(())
    }

    async fn read(&self, segment: Segment) -> Result<String> {
        let state = self.state.lock().unwrap();
        Ok(match segment {
            Segment::Body => state.body.clone(),
            Segment::Tag => state.tag.clone(),
            Segment::Data => state.body.chars().skip(state.addr.0).take(state.addr.1 - state.addr.0).collect(),
        })
    }

    async fn write(&self, segment: Segment, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match segment {
            Segment::Body => {
                state.body.push_str(text);
                state.dirty = true;
            }
            Segment::Tag => state.tag.push_str(text),
            Segment::Data => {
                let start = char_to_byte(&state.body, state.addr.0);
                let end = char_to_byte(&state.body, state.addr.1);
                state.body.replace_range(start..end, text);
                let q = state.addr.0 + text.chars().count();
                state.addr = (q, q);
                state.dirty = true;
            }
        }
        state.ops.push(format!("write {:?}", segment).to_lowercase());
        Ok(())
    }

    async fn ctl(&self, directive: &str) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            if state.deleted {
                bail!("window deleted");
            }
            state.ops.push(format!("ctl {}", directive));
            match directive {
                "clean" => state.dirty = false,
                "cleartag" => state.tag.clear(),
                "delete" => state.deleted = true,
                _ => {}
            }
        }
        if directive == "delete" {
            self.close_events();
        }
        Ok(())
    }

    async fn events(&self) -> Result<mpsc::Receiver<Event>> {
        self.rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow!("event stream already taken"))
    }

    async fn write_event(&self, event: &Event) -> Result<()> {
        self.state.lock().unwrap().written.push(event.clone());
        Ok(())
    }
}

/// Hands out `MockSurface`s and remembers them in creation order.
pub struct MockEditor {
    surfaces: Mutex<Vec<Arc<MockSurface>>>,
    fail_next: AtomicBool,
    yielding: bool,
}

impl MockEditor {
    pub fn new() -> Self {
        Self {
            surfaces: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
            yielding: false,
        }
    }

    /// Suspend once inside `new_surface`, so callers joined on one task
    /// interleave like concurrent window tasks do.
    pub fn yielding(mut self) -> Self {
        self.yielding = true;
        self
    }

    /// Make the next `new_surface` call fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn surfaces(&self) -> Vec<Arc<MockSurface>> {
        self.surfaces.lock().unwrap().clone()
    }

    /// The live surface with this full name.
    pub fn surface(&self, name: &str) -> Option<Arc<MockSurface>> {
        self.surfaces
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.name() == name && !s.is_deleted())
            .cloned()
    }
}

#[async_trait::async_trait]
impl Editor for MockEditor {
    async fn new_surface(&self) -> Result<Arc<dyn Surface>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            bail!("editor is not running");
        }
        if self.yielding {
            tokio::task::yield_now().await;
        }
        let surface = Arc::new(MockSurface::new());
        self.surfaces.lock().unwrap().push(surface.clone());
        Ok(surface as Arc<dyn Surface>)
    }
}

#[derive(Default)]
struct TrackerState {
    calls: Vec<String>,
    searches: Vec<String>,
    updates: Vec<IssueUpdate>,
    comments: Vec<String>,
    drafts: Vec<IssueDraft>,
}

/// A tracker with canned answers that logs each call by name.
pub struct MockTracker {
    projects: Vec<String>,
    search_results: Vec<IssueSummary>,
    issues: HashMap<String, Issue>,
    created_key: String,
    fail_projects: bool,
    fail_update: bool,
    state: Mutex<TrackerState>,
}

impl MockTracker {
    pub fn new() -> Self {
        Self {
            projects: vec!["PROJ".to_string(), "OPS".to_string()],
            search_results: Vec::new(),
            issues: HashMap::new(),
            created_key: "PROJ-100".to_string(),
            fail_projects: false,
            fail_update: false,
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn with_search(mut self, results: Vec<IssueSummary>) -> Self {
        self.search_results = results;
        self
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.insert(issue.key.clone(), issue);
        self
    }

    pub fn with_created(mut self, key: &str) -> Self {
        self.created_key = key.to_string();
        self
    }

    pub fn failing_projects(mut self) -> Self {
        self.fail_projects = true;
        self
    }

    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn searches(&self) -> Vec<String> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn last_update(&self) -> Option<IssueUpdate> {
        self.state.lock().unwrap().updates.last().cloned()
    }

    pub fn comments(&self) -> Vec<String> {
        self.state.lock().unwrap().comments.clone()
    }

    pub fn last_draft(&self) -> Option<IssueDraft> {
        self.state.lock().unwrap().drafts.last().cloned()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn failure(method: &'static str, path: String, status: u16) -> TrackerError {
        TrackerError::Status {
            method,
            path,
            status,
            body: "mock failure".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Tracker for MockTracker {
    async fn project_keys(&self) -> Result<Vec<String>, TrackerError> {
        self.record("projects".to_string());
        if self.fail_projects {
            return Err(Self::failure("GET", "project".to_string(), 500));
        }
        Ok(self.projects.clone())
    }

    async fn search(&self, jql: &str) -> Result<Vec<IssueSummary>, TrackerError> {
        self.record("search".to_string());
        self.state.lock().unwrap().searches.push(jql.to_string());
        Ok(self.search_results.clone())
    }

    async fn issue(&self, key: &str) -> Result<Issue, TrackerError> {
        self.record(format!("issue {}", key));
        self.issues
            .get(key)
            .cloned()
            .ok_or_else(|| Self::failure("GET", format!("issue/{}", key), 404))
    }

    async fn transition(&self, key: &str, transition_id: &str) -> Result<(), TrackerError> {
        self.record(format!("transition {} {}", key, transition_id));
        Ok(())
    }

    async fn update(&self, key: &str, update: &IssueUpdate) -> Result<(), TrackerError> {
        self.record(format!("update {}", key));
        if self.fail_update {
            return Err(Self::failure("PUT", format!("issue/{}", key), 400));
        }
        self.state.lock().unwrap().updates.push(update.clone());
        Ok(())
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<(), TrackerError> {
        self.record(format!("comment {}", key));
        self.state.lock().unwrap().comments.push(body.to_string());
        Ok(())
    }

    async fn create(&self, draft: &IssueDraft) -> Result<String, TrackerError> {
        self.record("create".to_string());
        self.state.lock().unwrap().drafts.push(draft.clone());
        Ok(self.created_key.clone())
    }
}

pub fn options() -> SessionOptions {
    SessionOptions {
        prefix: "/jira/test".to_string(),
        mine_query: "assignee = currentUser()".to_string(),
    }
}

pub struct TestSession {
    pub session: Arc<Session>,
    pub editor: Arc<MockEditor>,
    pub tracker: Arc<MockTracker>,
}

pub async fn session(tracker: MockTracker) -> TestSession {
    session_with_editor(MockEditor::new(), tracker).await
}

pub async fn session_with_editor(editor: MockEditor, tracker: MockTracker) -> TestSession {
    let editor = Arc::new(editor);
    let tracker = Arc::new(tracker);
    let session = Session::new(options(), editor.clone(), tracker.clone())
        .await
        .expect("mock tracker lists projects");
    TestSession {
        session,
        editor,
        tracker,
    }
}

/// An open bug with two legal transitions.
pub fn issue(key: &str) -> Issue {
    Issue {
        key: key.to_string(),
        summary: "Fix the build".to_string(),
        issue_type: "Bug".to_string(),
        status: "Open".to_string(),
        assignee: Some("Bob".to_string()),
        reporter: Some("Ann".to_string()),
        created: Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).single(),
        updated: Utc.with_ymd_and_hms(2024, 1, 3, 10, 30, 0).single(),
        description: "It fails on CI.".to_string(),
        comments: Vec::new(),
        transitions: vec![
            Transition::new("21", "Start Progress"),
            Transition::new("31", "Resolve"),
        ],
    }
}

pub fn two_summaries() -> Vec<IssueSummary> {
    vec![
        IssueSummary {
            key: "PROJ-2".to_string(),
            issue_type: "Bug".to_string(),
            status: "Open".to_string(),
            summary: "second".to_string(),
        },
        IssueSummary {
            key: "PROJ-1".to_string(),
            issue_type: "Task".to_string(),
            status: "Done".to_string(),
            summary: "first".to_string(),
        },
    ]
}
