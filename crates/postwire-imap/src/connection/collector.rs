//! Tag correlation between the reader task and waiting callers.
//!
//! The reader task feeds every decoded response in. Untagged data goes to
//! the single current command; a tagged line resolves the waiter registered
//! under its tag. A channel failure resolves every outstanding waiter at
//! once and poisons the collector so later registrations fail fast.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::parser::{ParsedResponse, TaggedResponse};

/// Everything the server sent for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// The completion line.
    pub tagged: TaggedResponse,
    /// Untagged responses received while the command was current, in order.
    pub untagged: Vec<ParsedResponse>,
}

/// Why a waiter was resolved without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The connection was closed or broke.
    Closed,
    /// A command deadline expired and the connection was abandoned.
    TimedOut,
}

type Outcome = Result<CommandResult, Failure>;

struct Pending {
    untagged: Vec<ParsedResponse>,
    waiter: oneshot::Sender<Outcome>,
}

#[derive(Default)]
struct Inner {
    pending: HashMap<String, Pending>,
    current: Option<String>,
    failed: Option<Failure>,
}

/// Shared map of outstanding commands.
#[derive(Default)]
pub struct Collector {
    inner: Mutex<Inner>,
}

/// Receiving side of one registered command.
#[derive(Debug)]
pub struct Waiter {
    receiver: oneshot::Receiver<Outcome>,
}

impl Waiter {
    /// Suspends until the command completes or the collector fails.
    ///
    /// Resolves immediately if that has already happened.
    ///
    /// # Errors
    ///
    /// Returns the [`Failure`] the collector was failed with.
    pub async fn wait(self) -> Result<CommandResult, Failure> {
        self.receiver.await.unwrap_or(Err(Failure::Closed))
    }
}

impl Collector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs a waiter for `tag` and makes it the current command.
    ///
    /// # Errors
    ///
    /// Fails with the stored [`Failure`] once the collector has been failed.
    pub fn register(&self, tag: &str) -> Result<Waiter, Failure> {
        let mut inner = self.lock();
        if let Some(failure) = inner.failed {
            return Err(failure);
        }
        if let Some(previous) = inner.current.as_deref() {
            warn!(previous, tag, "registering while another command is current");
        }
        let (sender, receiver) = oneshot::channel();
        inner.pending.insert(
            tag.to_string(),
            Pending {
                untagged: Vec::new(),
                waiter: sender,
            },
        );
        inner.current = Some(tag.to_string());
        Ok(Waiter { receiver })
    }

    /// Appends an untagged response to the current command.
    ///
    /// Returns `false` when no command is current and the response was dropped.
    pub fn add_untagged(&self, response: ParsedResponse) -> bool {
        let mut inner = self.lock();
        let Inner {
            pending, current, ..
        } = &mut *inner;
        match current.as_ref().and_then(|tag| pending.get_mut(tag)) {
            Some(entry) => {
                entry.untagged.push(response);
                true
            }
            None => {
                debug!(?response, "dropping unsolicited untagged response");
                false
            }
        }
    }

    /// Resolves the waiter for the tagged response's tag.
    ///
    /// Returns `false` when no command is registered under that tag.
    pub fn complete(&self, tagged: TaggedResponse) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.pending.remove(&tagged.tag) else {
            warn!(tag = %tagged.tag, "tagged response for unknown tag");
            return false;
        };
        if inner.current.as_deref() == Some(tagged.tag.as_str()) {
            inner.current = None;
        }
        drop(inner);
        // The caller may have given up (timeout); that is not an error here.
        let _ = entry.waiter.send(Ok(CommandResult {
            tagged,
            untagged: entry.untagged,
        }));
        true
    }

    /// Resolves every pending waiter with `failure` and rejects later
    /// registrations.
    pub fn fail(&self, failure: Failure) {
        let mut inner = self.lock();
        if inner.failed.is_none() {
            inner.failed = Some(failure);
        }
        inner.current = None;
        let drained: Vec<_> = inner.pending.drain().collect();
        drop(inner);
        for (tag, entry) in drained {
            debug!(tag, ?failure, "failing pending command");
            let _ = entry.waiter.send(Err(failure));
        }
    }

    /// Returns the failure the collector was failed with, if any.
    #[must_use]
    pub fn failure(&self) -> Option<Failure> {
        self.lock().failed
    }

    /// Number of commands awaiting completion.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }
}
