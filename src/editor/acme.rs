use anyhow::{bail, Context, Result};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex};

use super::{Editor, Event, EventDecoder, Segment, Surface};
use crate::config::EditorConfig;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Talks to a running acme through the plan9port `9p` command.
#[derive(Debug, Clone)]
pub struct AcmeEditor {
    program: String,
    service: String,
}

impl AcmeEditor {
    pub fn new(program: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            service: service.into(),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.program.clone(), config.service.clone())
    }

    fn path(&self, file: &str) -> String {
        format!("{}/{}", self.service, file)
    }

    /// Whether the acme file server answers at all.
    pub async fn is_running(&self) -> bool {
        Command::new(&self.program)
            .args(["ls", &self.service])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn read_file(&self, file: &str) -> Result<String> {
        let path = self.path(file);
        let output = Command::new(&self.program)
            .args(["read", &path])
            .output()
            .await
            .with_context(|| format!("Failed to run {} read {}", self.program, path))?;

        if !output.status.success() {
            bail!(
                "{} read {} failed: {}",
                self.program,
                path,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn write_file(&self, file: &str, data: &str) -> Result<()> {
        let path = self.path(file);
        let mut child = Command::new(&self.program)
            .args(["write", &path])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to run {} write {}", self.program, path))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(data.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path))?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            bail!(
                "{} write {} failed: {}",
                self.program,
                path,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    /// A `9p write` that stays open; every write to its stdin becomes one
    /// write on the file.
    fn spawn_writer(&self, file: &str) -> Result<(Child, ChildStdin)> {
        let path = self.path(file);
        let mut child = Command::new(&self.program)
            .args(["write", &path])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to open {} for writing", path))?;
        let stdin = child
            .stdin
            .take()
            .with_context(|| format!("No stdin for writer of {}", path))?;
        Ok((child, stdin))
    }

    fn spawn_reader(&self, file: &str) -> Result<Child> {
        let path = self.path(file);
        Command::new(&self.program)
            .args(["read", &path])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to open {} for reading", path))
    }
}

#[async_trait::async_trait]
impl Editor for AcmeEditor {
    async fn new_surface(&self) -> Result<Arc<dyn Surface>> {
        let ctl = self.read_file("new/ctl").await?;
        let id = parse_window_id(&ctl)?;
        tracing::debug!("acme window {} created", id);
        Ok(Arc::new(AcmeSurface::open(self.clone(), id)?))
    }
}

/// One acme window.
///
/// acme resets a window's address whenever the last open of its `addr` file
/// goes away, so a writer on `addr` is held for the window's lifetime. The
/// event file is likewise held open for reading and for writing.
pub struct AcmeSurface {
    editor: AcmeEditor,
    id: u32,
    addr: Mutex<ChildStdin>,
    event_out: Mutex<ChildStdin>,
    event_reader: std::sync::Mutex<Option<Child>>,
    _addr_holder: Child,
    _event_writer: Child,
}

impl AcmeSurface {
    pub fn open(editor: AcmeEditor, id: u32) -> Result<Self> {
        let (addr_holder, addr) = editor.spawn_writer(&format!("{}/addr", id))?;
        let event_reader = editor.spawn_reader(&format!("{}/event", id))?;
        let (event_writer, event_out) = editor.spawn_writer(&format!("{}/event", id))?;
        Ok(Self {
            editor,
            id,
            addr: Mutex::new(addr),
            event_out: Mutex::new(event_out),
            event_reader: std::sync::Mutex::new(Some(event_reader)),
            _addr_holder: addr_holder,
            _event_writer: event_writer,
        })
    }

    fn file(&self, name: &str) -> String {
        format!("{}/{}", self.id, name)
    }
}

#[async_trait::async_trait]
impl Surface for AcmeSurface {
    async fn set_name(&self, name: &str) -> Result<()> {
        self.ctl(&format!("name {}", name)).await
    }

    async fn set_addr(&self, addr: &str) -> Result<()> {
        // Each address must arrive as its own write, so callers never set two
        // addresses back to back without touching data in between.
        let mut stdin = self.addr.lock().await;
        stdin
            .write_all(addr.as_bytes())
            .await
            .with_context(|| format!("Failed to set address {:?} on window {}", addr, self.id))?;
        stdin.flush().await?;
        Ok(())
    }

    async fn read(&self, segment: Segment) -> Result<String> {
        let name = match segment {
            Segment::Body => "body",
            Segment::Tag => "tag",
            Segment::Data => "xdata",
        };
        self.editor.read_file(&self.file(name)).await
    }

    async fn write(&self, segment: Segment, text: &str) -> Result<()> {
        let name = match segment {
            Segment::Body => "body",
            Segment::Tag => "tag",
            Segment::Data => "data",
        };
        // `9p write` never sends a zero-length write, which is what acme
        // needs to delete the addressed text.
        let text = if text.is_empty() && segment == Segment::Data {
            "\n"
        } else {
            text
        };
        self.editor.write_file(&self.file(name), text).await
    }

    async fn ctl(&self, directive: &str) -> Result<()> {
        self.editor
            .write_file(&self.file("ctl"), &format!("{}\n", directive))
            .await
    }

    async fn events(&self) -> Result<mpsc::Receiver<Event>> {
        let mut child = self
            .event_reader
            .lock()
            .map_err(|_| anyhow::anyhow!("event reader lock poisoned"))?
            .take()
            .with_context(|| format!("Events of window {} already taken", self.id))?;
        let stdout = child
            .stdout
            .take()
            .with_context(|| format!("No event output for window {}", self.id))?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let id = self.id;
        tokio::spawn(async move {
            let mut decoder = EventDecoder::new(stdout);
            loop {
                match decoder.next_event().await {
                    Ok(Some(event)) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("window {} event stream: {}", id, e);
                        break;
                    }
                }
            }
            let _ = child.kill().await;
            tracing::debug!("window {} event stream closed", id);
        });

        Ok(rx)
    }

    async fn write_event(&self, event: &Event) -> Result<()> {
        let mut stdin = self.event_out.lock().await;
        stdin
            .write_all(event.to_write_back().as_bytes())
            .await
            .with_context(|| format!("Failed to write event back to window {}", self.id))?;
        stdin.flush().await?;
        Ok(())
    }
}

/// The first field of a `ctl` reply is the window id.
fn parse_window_id(ctl: &str) -> Result<u32> {
    ctl.split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .with_context(|| format!("Unexpected ctl reply {:?}", ctl))
}
