mod acme;
mod event;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

pub use acme::AcmeEditor;
pub use event::{Event, EventClass, EventDecoder};

/// Named parts of a surface that can be read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Whole body. Writes append.
    Body,
    /// Tag line. Writes append.
    Tag,
    /// Body text inside the current address. Writes replace it.
    Data,
}

/// One live text window in the editor.
#[async_trait::async_trait]
pub trait Surface: Send + Sync {
    async fn set_name(&self, name: &str) -> Result<()>;

    /// Set the current address, e.g. `,` or `#12,#40` or `$`.
    async fn set_addr(&self, addr: &str) -> Result<()>;

    async fn read(&self, segment: Segment) -> Result<String>;

    async fn write(&self, segment: Segment, text: &str) -> Result<()>;

    /// Send a control directive: `clean`, `mark`, `show`, `cleartag`, `dot=addr`, `delete`.
    async fn ctl(&self, directive: &str) -> Result<()>;

    /// Take the event stream. It ends when the window goes away. Only the
    /// first call succeeds.
    async fn events(&self) -> Result<mpsc::Receiver<Event>>;

    /// Hand an event back to the editor for its default handling.
    async fn write_event(&self, event: &Event) -> Result<()>;
}

#[async_trait::async_trait]
pub trait Editor: Send + Sync {
    async fn new_surface(&self) -> Result<Arc<dyn Surface>>;
}
