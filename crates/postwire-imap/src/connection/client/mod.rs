//! IMAP client connection.
//!
//! A [`Client`] owns the write half of the connection. A spawned reader task
//! owns the read half, decodes every response and hands it to a shared
//! [`Collector`], which routes untagged data to the current command and
//! resolves its waiter when the tagged completion arrives.
//!
//! Operations check the runtime [`ProtocolState`] before anything is sent,
//! so a call in the wrong state fails without touching the wire:
//!
//! ```text
//! NotAuthenticated ── login() ──→ Authenticated ── select()/examine() ──→ Selected
//!                                       ↑                                    │
//!                                       └───────────── close() ──────────────┘
//! any state ── logout()/disconnect() ──→ Logout
//! ```

mod authenticated;
mod not_authenticated;
mod selected;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::collector::{Collector, CommandResult, Failure};
use super::config::Config;
use super::framed::FramedStream;
use super::state::ProtocolState;
use crate::command::{Command, TagGenerator};
use crate::parser::{ParsedResponse, ResponseParser, Status};
use crate::{Error, Result};

/// Grace period for closing the write half during teardown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// IMAP client connection.
pub struct Client<S> {
    writer: Option<WriteHalf<S>>,
    reader: Option<JoinHandle<()>>,
    collector: Arc<Collector>,
    tags: TagGenerator,
    state: ProtocolState,
    capabilities: Vec<String>,
    host: String,
    port: u16,
    command_timeout: Duration,
}

impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &self.state)
            .field("connected", &self.writer.is_some())
            .finish_non_exhaustive()
    }
}

impl<S> Drop for Client<S> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// What the server said when the connection opened.
#[derive(Debug, Default)]
pub(crate) struct Greeting {
    pub(crate) preauth: bool,
    pub(crate) capabilities: Vec<String>,
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Splits the stream and starts the reader task.
    pub(crate) fn start(
        framed: FramedStream<S>,
        tags: TagGenerator,
        greeting: Greeting,
        config: &Config,
    ) -> Self {
        let (stream, framer) = framed.into_parts();
        let (read_half, write_half) = tokio::io::split(stream);
        let collector = Arc::new(Collector::new());
        let reader = tokio::spawn(read_loop(
            FramedStream::from_parts(read_half, framer),
            Arc::clone(&collector),
        ));

        Self {
            writer: Some(write_half),
            reader: Some(reader),
            collector,
            tags,
            state: if greeting.preauth {
                ProtocolState::Authenticated
            } else {
                ProtocolState::NotAuthenticated
            },
            capabilities: greeting.capabilities,
            host: config.host.clone(),
            port: config.port,
            command_timeout: config.command_timeout,
        }
    }

    /// Returns the current protocol state.
    #[must_use]
    pub const fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Returns the selected mailbox name, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        self.state.selected_mailbox()
    }

    /// Returns the most recently reported server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Checks for a capability, ignoring case.
    #[must_use]
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    /// Returns `false` once the connection has failed or been closed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.writer.is_some() && self.collector.failure().is_none()
    }

    /// Sends CAPABILITY and stores the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the server rejects the command.
    pub async fn capability(&mut self) -> Result<Vec<String>> {
        let result = self.run_command(Command::Capability).await?;
        expect_ok(&result, Error::ServerError)?;
        let caps = result
            .untagged
            .into_iter()
            .find_map(|r| match r {
                ParsedResponse::Capability(caps) => Some(caps),
                _ => None,
            })
            .unwrap_or_default();
        self.capabilities.clone_from(&caps);
        Ok(caps)
    }

    /// Sends NOOP and returns any untagged updates the server flushed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the server rejects the command.
    pub async fn noop(&mut self) -> Result<Vec<ParsedResponse>> {
        let result = self.run_command(Command::Noop).await?;
        expect_ok(&result, Error::ServerError)?;
        Ok(result.untagged)
    }

    /// Sends one command and waits for its tagged completion.
    ///
    /// The tagged status is not checked here; callers map NO and BAD to the
    /// error that fits the operation.
    pub(crate) async fn run_command(&mut self, command: Command) -> Result<CommandResult> {
        self.ensure_connected()?;
        let tag = self
            .tags
            .next()
            .ok_or_else(|| Error::Protocol("tag counter exhausted".to_string()))?;
        let bytes = command.serialize(&tag)?;
        let waiter = self
            .collector
            .register(&tag)
            .map_err(|_| self.connection_failed())?;

        debug!(tag, command = command.name(), "sending command");
        let written = match self.writer.as_mut() {
            Some(writer) => write_flush(writer, &bytes).await,
            None => Err(std::io::ErrorKind::NotConnected.into()),
        };
        if let Err(e) = written {
            warn!(tag, error = %e, "write failed");
            self.teardown().await;
            return Err(self.connection_failed());
        }

        let result = match tokio::time::timeout(self.command_timeout, waiter.wait()).await {
            Ok(Ok(result)) => result,
            Ok(Err(failure)) => {
                self.teardown().await;
                return Err(match failure {
                    Failure::Closed => self.connection_failed(),
                    Failure::TimedOut => Error::Timeout(self.command_timeout),
                });
            }
            Err(_) => {
                warn!(tag, timeout = ?self.command_timeout, "command timed out, dropping connection");
                self.collector.fail(Failure::TimedOut);
                self.teardown().await;
                return Err(Error::Timeout(self.command_timeout));
            }
        };

        debug!(
            tag,
            status = result.tagged.status.as_str(),
            untagged = result.untagged.len(),
            "command completed"
        );
        if let Some(reason) = result.untagged.iter().find_map(|r| match r {
            ParsedResponse::Bye(reason) => Some(reason),
            _ => None,
        }) {
            info!(reason = %reason, "server closing connection");
            self.state = ProtocolState::Logout;
        }
        Ok(result)
    }

    /// Fails with `ConnectionFailed` once the connection is gone.
    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(self.connection_failed())
        }
    }

    /// Requires `Authenticated` or `Selected`.
    pub(crate) fn require_authenticated(&self, operation: &str) -> Result<()> {
        self.ensure_connected()?;
        match self.state {
            ProtocolState::Authenticated | ProtocolState::Selected(_) => Ok(()),
            ProtocolState::NotAuthenticated => Err(Error::InvalidState(format!(
                "{operation} requires an authenticated session"
            ))),
            ProtocolState::Logout => Err(self.connection_failed()),
        }
    }

    /// Requires `Selected`.
    pub(crate) fn require_selected(&self) -> Result<()> {
        self.ensure_connected()?;
        match self.state {
            ProtocolState::Selected(_) => Ok(()),
            ProtocolState::Logout => Err(self.connection_failed()),
            ProtocolState::NotAuthenticated | ProtocolState::Authenticated => {
                Err(Error::NoFolderSelected)
            }
        }
    }

    /// Requires a mailbox opened read-write.
    pub(crate) fn require_writable(&self, operation: &str) -> Result<()> {
        self.require_selected()?;
        if self.state.is_read_only() {
            return Err(Error::InvalidState(format!(
                "{operation} on a read-only mailbox"
            )));
        }
        Ok(())
    }

    /// Stops the reader, closes the write half and enters `Logout`.
    pub(crate) async fn teardown(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(mut writer) = self.writer.take() {
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, writer.shutdown()).await;
        }
        self.collector.fail(Failure::Closed);
        self.state = ProtocolState::Logout;
        debug!(host = %self.host, "connection torn down");
    }

    fn connection_failed(&self) -> Error {
        Error::ConnectionFailed {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// Maps the tagged status: OK passes, NO goes through `on_no`, BAD is a
/// [`Error::ServerError`].
pub(crate) fn expect_ok(result: &CommandResult, on_no: impl FnOnce(String) -> Error) -> Result<()> {
    match result.tagged.status {
        Status::Ok => Ok(()),
        Status::No => Err(on_no(result.tagged.message.clone())),
        Status::Bad => Err(Error::ServerError(result.tagged.message.clone())),
    }
}

async fn write_flush<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}

/// Reads until the stream ends, then fails every outstanding waiter.
async fn read_loop<S: AsyncRead>(mut framed: FramedStream<ReadHalf<S>>, collector: Arc<Collector>) {
    loop {
        match framed.read_response().await {
            Ok(Some(raw)) => {
                debug!(line = %String::from_utf8_lossy(&raw[..raw.len().min(200)]), "received");
                match ResponseParser::parse(&raw) {
                    ParsedResponse::Tagged(tagged) => {
                        collector.complete(tagged);
                    }
                    other => {
                        collector.add_untagged(other);
                    }
                }
            }
            Ok(None) => {
                info!("server closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "connection read failed");
                break;
            }
        }
    }
    collector.fail(Failure::Closed);
}
