use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::expand::expand;
use super::{Session, Window};
use crate::editor::{Event, EventClass};
use crate::utils::truncate_str;

/// Run the event loop of one window on its own task.
pub(crate) fn spawn(session: Arc<Session>, window: Arc<Window>, events: mpsc::Receiver<Event>) {
    tokio::spawn(run(session, window, events));
}

async fn run(session: Arc<Session>, window: Arc<Window>, mut events: mpsc::Receiver<Event>) {
    while let Some(event) = events.recv().await {
        debug!(
            "{}: event {}{} {} {} {:?}",
            window.title(),
            event.origin,
            event.kind,
            event.q0,
            event.q1,
            truncate_str(&event.text, 60)
        );
        if let Some(unhandled) = handle(&session, &window, event).await {
            if let Err(e) = window.surface().write_event(&unhandled).await {
                warn!("{}: cannot write event back: {:#}", window.title(), e);
            }
        }
    }
    debug!("{}: event stream ended", window.title());
    session.registry().remove(window.title());
}

/// Act on one event. Returns the event when the editor should handle it.
pub(crate) async fn handle(session: &Arc<Session>, window: &Window, event: Event) -> Option<Event> {
    match event.class() {
        EventClass::Execute => execute(session, window, event).await,
        EventClass::Look => look(session, window, event).await,
        EventClass::Other => Some(event),
    }
}

async fn execute(session: &Arc<Session>, window: &Window, event: Event) -> Option<Event> {
    let command = event.text.trim().to_string();
    match command.as_str() {
        "Put" => {
            session.commit(window).await;
            session.refresh(window).await;
        }
        "Get" => session.refresh(window).await,
        "New" => session.create_issue().await,
        "Search" => search(session, window, &event.arg).await,
        _ => {
            let transition = if window.is_issue() {
                window.transition_for(&command)
            } else {
                None
            };
            if let Some(id) = transition {
                session.transition_issue(window, &id).await;
                session.refresh(window).await;
            } else if let Some(rest) = command.strip_prefix("Search") {
                let query = if rest.trim().is_empty() { event.arg.as_str() } else { rest };
                search(session, window, query).await;
            } else {
                return Some(event);
            }
        }
    }
    None
}

/// Searching is not built yet; say so rather than dropping the query.
async fn search(session: &Arc<Session>, window: &Window, query: &str) {
    let query = query.trim();
    let message = if query.is_empty() {
        format!("{}: Search not implemented yet", window.title())
    } else {
        format!("{}: Search {:?} not implemented yet", window.title(), query)
    };
    session.report(&message).await;
}

async fn look(session: &Arc<Session>, window: &Window, mut event: Event) -> Option<Event> {
    if session.look(&event.text).await {
        return None;
    }
    if event.is_builtin() {
        return Some(event);
    }

    // Upper-case kinds come from the tag.
    let content = if event.kind == 'L' {
        window.tag().await
    } else {
        window.body().await
    };
    match content {
        Ok(content) => match expand(&mut event, &content) {
            Ok(()) => debug!("{}: expanded to {:?}", window.title(), event.text),
            Err(e) => warn!("{}: cannot expand selection: {}", window.title(), e),
        },
        Err(e) => warn!("{}: cannot read window text: {:#}", window.title(), e),
    }

    if session.look(&event.text).await {
        None
    } else {
        Some(event)
    }
}
