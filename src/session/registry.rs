use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::Window;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Window already exists: {0}")]
    AlreadyExists(String),

    #[error("Session has ended, refusing window: {0}")]
    Closed(String),
}

#[derive(Default)]
struct Inner {
    by_title: HashMap<String, Arc<Window>>,
    ended: bool,
}

/// The live windows of a session, keyed by title.
///
/// Every operation takes the one lock for its whole critical section and
/// hands windows out by `Arc`; nothing bound to a window runs while the lock
/// is held. The empty-signal fires once, when the last window goes away or
/// on a forced drain, and after that no window can be added.
pub struct WindowRegistry {
    inner: Mutex<Inner>,
    empty: watch::Sender<bool>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        let (empty, _) = watch::channel(false);
        Self {
            inner: Mutex::new(Inner::default()),
            empty,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a fully built window, unless its title is taken or the
    /// session is over.
    pub fn create(&self, window: Arc<Window>) -> Result<Arc<Window>, RegistryError> {
        let mut inner = self.lock();
        let title = window.title().to_string();
        if inner.ended {
            return Err(RegistryError::Closed(title));
        }
        if inner.by_title.contains_key(&title) {
            return Err(RegistryError::AlreadyExists(title));
        }
        debug!("registered window {:?}", title);
        inner.by_title.insert(title, window.clone());
        Ok(window)
    }

    pub fn find(&self, title: &str) -> Option<Arc<Window>> {
        self.lock().by_title.get(title).cloned()
    }

    /// Forget a window. Returns whether this call ended the session.
    ///
    /// Removing an unknown title is a no-op; teardown and natural exits race.
    pub fn remove(&self, title: &str) -> bool {
        let now_empty = {
            let mut inner = self.lock();
            if inner.by_title.remove(title).is_none() {
                return false;
            }
            debug!("unregistered window {:?}", title);
            if inner.by_title.is_empty() {
                inner.ended = true;
                true
            } else {
                false
            }
        };
        now_empty && self.fire()
    }

    /// Remove every window, close each surface, then end the session no
    /// matter what. Returns whether this call fired the empty-signal.
    pub async fn drain_all(&self) -> bool {
        let drained: Vec<Arc<Window>> = {
            let mut inner = self.lock();
            inner.ended = true;
            inner.by_title.drain().map(|(_, w)| w).collect()
        };

        let closes = drained.iter().map(|window| async move {
            if let Err(e) = window.close().await {
                warn!("Failed to close window {:?}: {:#}", window.title(), e);
            }
        });
        futures::future::join_all(closes).await;

        self.fire()
    }

    fn fire(&self) -> bool {
        let fired = self.empty.send_if_modified(|ended| {
            if *ended {
                false
            } else {
                *ended = true;
                true
            }
        });
        if fired {
            debug!("window registry empty, session over");
        }
        fired
    }

    pub fn has_ended(&self) -> bool {
        *self.empty.borrow()
    }

    /// Resolves once the empty-signal has fired.
    pub async fn wait_empty(&self) {
        let mut rx = self.empty.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|ended| *ended).await;
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.empty.subscribe()
    }

    pub fn len(&self) -> usize {
        self.lock().by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().by_title.is_empty()
    }

    pub fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.lock().by_title.keys().cloned().collect();
        titles.sort();
        titles
    }
}

impl Default for WindowRegistry {
    fn default() -> Self {
        Self::new()
    }
}
