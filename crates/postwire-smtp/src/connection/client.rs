//! SMTP client.
//!
//! One reply per command, read line by line from a buffered stream. The
//! session state is checked before anything is written:
//!
//! ```text
//! NotConnected ─ greeting ─→ Connected ─ EHLO ─→ Ready ─ AUTH ─→ Authenticated
//!                                                  │                  │
//!                                                  └──── send() ──────┘
//! any state ─ quit() / failure ─→ Disconnected
//! ```

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, info, warn};

use super::ServerInfo;
use super::config::{Config, Security};
use super::state::SmtpState;
use super::stream::{SmtpStream, open};
use crate::command::{Command, prepare_data};
use crate::error::{Error, Result};
use crate::parser::{ReplyAccumulator, parse_line};
use crate::types::{Address, AuthMechanism, Reply, ReplyCode};

/// Grace period for closing the stream after QUIT.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Longest reply line accepted, CRLF included (RFC 5321 section 4.5.3.1.5).
const MAX_REPLY_LINE: usize = 512;

/// SMTP client over any byte stream.
#[derive(Debug)]
pub struct Client<S> {
    stream: BufReader<S>,
    state: SmtpState,
    server_info: ServerInfo,
    host: String,
    port: u16,
    command_timeout: Duration,
}

impl Client<SmtpStream> {
    /// Connects, reads the greeting, sends EHLO and, for
    /// [`Security::StartTls`], upgrades the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the server is unreachable or
    /// does not greet with 220, [`Error::Timeout`] if a deadline expires and
    /// [`Error::Tls`] if STARTTLS or the handshake fails.
    pub async fn connect(config: &Config) -> Result<Self> {
        let stream = open(config).await?;
        let mut client = Self::from_stream(stream, config).await?;
        client.ehlo(&config.ehlo_hostname).await?;
        if config.security == Security::StartTls {
            client = client.starttls(&config.ehlo_hostname).await?;
        }
        Ok(client)
    }

    /// Upgrades the session with STARTTLS and repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the server does not offer STARTTLS, refuses
    /// it or the handshake fails.
    pub async fn starttls(mut self, ehlo_hostname: &str) -> Result<Self> {
        self.ensure_open()?;
        if self.state != SmtpState::Ready {
            return Err(Error::InvalidState("STARTTLS requires EHLO first".into()));
        }
        if !self.server_info.supports_starttls() {
            return Err(Error::Tls("server does not advertise STARTTLS".into()));
        }

        let reply = self.command(Command::StartTls).await?;
        if reply.code != ReplyCode::SERVICE_READY {
            return Err(Error::Tls(format!(
                "STARTTLS refused: {} {}",
                reply.code,
                reply.message_text()
            )));
        }
        if !self.stream.buffer().is_empty() {
            warn!(
                bytes = self.stream.buffer().len(),
                "discarding plaintext received after STARTTLS"
            );
        }

        let plain = self.stream.into_inner();
        let tls = tokio::time::timeout(self.command_timeout, plain.upgrade_to_tls(&self.host))
            .await
            .map_err(|_| Error::Timeout(self.command_timeout))??;
        info!(host = %self.host, "STARTTLS negotiated");

        let mut upgraded = Self {
            stream: BufReader::new(tls),
            state: SmtpState::Connected,
            server_info: ServerInfo {
                greeting: self.server_info.greeting,
                hostname: self.server_info.hostname,
                extensions: Vec::new(),
            },
            host: self.host,
            port: self.port,
            command_timeout: self.command_timeout,
        };
        upgraded.ehlo(ehlo_hostname).await?;
        Ok(upgraded)
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a connected stream and reads the greeting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] unless the server greets with 220
    /// within `config.connect_timeout`.
    pub async fn from_stream(stream: S, config: &Config) -> Result<Self> {
        let mut client = Self {
            stream: BufReader::new(stream),
            state: SmtpState::NotConnected,
            server_info: ServerInfo::default(),
            host: config.host.clone(),
            port: config.port,
            command_timeout: config.command_timeout,
        };

        let greeting = client.read_reply(config.connect_timeout).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            warn!(code = %greeting.code, message = %greeting.message_text(), "server refused session");
            client.state = SmtpState::Disconnected;
            return Err(client.connection_failed());
        }

        client.server_info.greeting = greeting.message_text();
        client.server_info.hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        client.state = SmtpState::Connected;
        info!(server = %client.server_info.hostname, "SMTP session opened");
        Ok(client)
    }

    /// Returns the session state.
    #[must_use]
    pub const fn state(&self) -> SmtpState {
        self.state
    }

    /// Returns what the server told us about itself.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServerError`] if the server does not answer 250.
    pub async fn ehlo(&mut self, hostname: &str) -> Result<()> {
        self.ensure_open()?;
        if !matches!(self.state, SmtpState::Connected | SmtpState::Ready) {
            return Err(Error::InvalidState(format!("EHLO in state {:?}", self.state)));
        }

        let reply = self
            .command(Command::Ehlo {
                hostname: hostname.to_string(),
            })
            .await?;
        if !reply.is_success() {
            return Err(server_error(&reply));
        }

        self.server_info.update_from_ehlo(&reply);
        self.state = SmtpState::Ready;
        debug!(extensions = ?self.server_info.extensions, "EHLO accepted");
        Ok(())
    }

    /// Authenticates with the best mechanism the server offers: LOGIN when
    /// advertised (or when nothing is), otherwise PLAIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] if the server rejects the
    /// credentials and [`Error::NotSupported`] if neither mechanism is offered.
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        let mechanisms = self.server_info.auth_mechanisms();
        if mechanisms.is_empty() || mechanisms.contains(&AuthMechanism::Login) {
            self.auth_login(username, password).await
        } else if mechanisms.contains(&AuthMechanism::Plain) {
            self.auth_plain(username, password).await
        } else {
            let offered: Vec<&str> = mechanisms.iter().map(|m| m.as_str()).collect();
            Err(Error::NotSupported(format!(
                "AUTH LOGIN or PLAIN (server offers {})",
                offered.join(" ")
            )))
        }
    }

    /// Authenticates with AUTH LOGIN: two 334 challenges answered with the
    /// base64 username and password, then 235.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] on any other reply.
    pub async fn auth_login(&mut self, username: &str, password: &str) -> Result<()> {
        self.require_ready_for_auth()?;

        let steps = [
            Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            },
            Command::AuthResponse(BASE64.encode(username)),
        ];
        for step in steps {
            let reply = self.command(step).await?;
            if reply.code != ReplyCode::AUTH_CONTINUE {
                return Err(auth_failed(&reply));
            }
        }

        let reply = self
            .command(Command::AuthResponse(BASE64.encode(password)))
            .await?;
        self.finish_auth(&reply)
    }

    /// Authenticates with AUTH PLAIN and an initial response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] unless the server answers 235.
    pub async fn auth_plain(&mut self, username: &str, password: &str) -> Result<()> {
        self.require_ready_for_auth()?;
        let credentials = format!("\0{username}\0{password}");
        let reply = self
            .command(Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(BASE64.encode(credentials.as_bytes())),
            })
            .await?;
        self.finish_auth(&reply)
    }

    /// Sends one message: MAIL FROM, RCPT TO per recipient, DATA, payload.
    ///
    /// The payload is normalized to CRLF and dot-stuffed. When the server
    /// advertised SIZE the prepared size is checked first and announced in
    /// MAIL FROM. A refused recipient aborts the transaction with RSET.
    ///
    /// # Errors
    ///
    /// - [`Error::MessageTooLarge`] before anything is sent
    /// - [`Error::RecipientRejected`] on a 5xx to RCPT
    /// - [`Error::SendFailed`] for any other refusal
    pub async fn send(&mut self, from: &Address, recipients: &[Address], message: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if !self.state.can_send() {
            return Err(Error::InvalidState("EHLO required before sending".into()));
        }
        if recipients.is_empty() {
            return Err(Error::SendFailed("no recipients".into()));
        }

        let payload = prepare_data(message);
        let size = payload.len();
        if let Some(limit) = self.server_info.size_limit()
            && size > limit
        {
            return Err(Error::MessageTooLarge { size, limit });
        }

        let reply = self
            .command(Command::MailFrom {
                from: from.clone(),
                size: self.server_info.supports_size().then_some(size),
            })
            .await?;
        if !reply.is_success() {
            return Err(send_failed("MAIL FROM", &reply));
        }

        for to in recipients {
            let reply = self.command(Command::RcptTo { to: to.clone() }).await?;
            if reply.is_success() {
                continue;
            }
            self.reset().await;
            return Err(if reply.is_permanent_error() {
                warn!(recipient = %to, code = %reply.code, "recipient rejected");
                Error::RecipientRejected(to.to_string())
            } else {
                send_failed(&format!("RCPT TO {to}"), &reply)
            });
        }

        let reply = self.command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            self.reset().await;
            return Err(send_failed("DATA", &reply));
        }

        debug!(bytes = size, "C: <message data>");
        self.write(&payload).await?;
        let reply = self.read_reply(self.command_timeout).await?;
        if !reply.is_success() {
            return Err(send_failed("message", &reply));
        }
        info!(recipients = recipients.len(), bytes = size, "message accepted");
        Ok(())
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServerError`] if the server does not answer 250.
    pub async fn noop(&mut self) -> Result<()> {
        let reply = self.command(Command::Noop).await?;
        if reply.is_success() {
            Ok(())
        } else {
            Err(server_error(&reply))
        }
    }

    /// Sends QUIT and closes the connection.
    ///
    /// The session ends `Disconnected` whatever the server answers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServerError`] if the reply is not 221, or the
    /// failure that prevented the exchange.
    pub async fn quit(&mut self) -> Result<()> {
        if self.state == SmtpState::Disconnected {
            return Ok(());
        }
        let outcome = self.command(Command::Quit).await;
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, self.stream.get_mut().shutdown()).await;
        self.state = SmtpState::Disconnected;
        info!(host = %self.host, "SMTP session closed");

        let reply = outcome?;
        if reply.code == ReplyCode::CLOSING {
            Ok(())
        } else {
            Err(server_error(&reply))
        }
    }

    /// RSET after a refused step; a failure here is only logged.
    async fn reset(&mut self) {
        match self.command(Command::Rset).await {
            Ok(reply) if reply.is_success() => {}
            Ok(reply) => warn!(code = %reply.code, "RSET refused"),
            Err(e) => warn!(error = %e, "RSET failed"),
        }
    }

    fn require_ready_for_auth(&self) -> Result<()> {
        self.ensure_open()?;
        match self.state {
            SmtpState::Ready => Ok(()),
            SmtpState::Authenticated => Err(Error::InvalidState("already authenticated".into())),
            _ => Err(Error::InvalidState("EHLO required before AUTH".into())),
        }
    }

    fn finish_auth(&mut self, reply: &Reply) -> Result<()> {
        if reply.code != ReplyCode::AUTH_SUCCESS {
            return Err(auth_failed(reply));
        }
        self.state = SmtpState::Authenticated;
        info!(host = %self.host, "authenticated");
        Ok(())
    }

    async fn command(&mut self, command: Command) -> Result<Reply> {
        self.ensure_open()?;
        debug!("C: {}", command.redacted());
        self.write(&command.serialize()).await?;
        self.read_reply(self.command_timeout).await
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self.stream.get_mut();
        let written = tokio::time::timeout(self.command_timeout, async {
            writer.write_all(bytes).await?;
            writer.flush().await
        })
        .await;
        match written {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(error = %e, "write failed");
                self.state = SmtpState::Disconnected;
                Err(self.connection_failed())
            }
            Err(_) => {
                warn!(timeout = ?self.command_timeout, "write timed out");
                self.state = SmtpState::Disconnected;
                Err(Error::Timeout(self.command_timeout))
            }
        }
    }

    async fn read_reply(&mut self, limit: Duration) -> Result<Reply> {
        match tokio::time::timeout(limit, read_reply_lines(&mut self.stream)).await {
            Ok(Ok(reply)) => {
                debug!("S: {} {}", reply.code, reply.message_text());
                Ok(reply)
            }
            Ok(Err(Error::Protocol(reason))) => {
                warn!(%reason, "malformed reply, dropping connection");
                self.state = SmtpState::Disconnected;
                Err(Error::Protocol(reason))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "connection lost while reading reply");
                self.state = SmtpState::Disconnected;
                Err(self.connection_failed())
            }
            Err(_) => {
                warn!(timeout = ?limit, "reply timed out, dropping connection");
                self.state = SmtpState::Disconnected;
                Err(Error::Timeout(limit))
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == SmtpState::Disconnected {
            Err(self.connection_failed())
        } else {
            Ok(())
        }
    }

    fn connection_failed(&self) -> Error {
        Error::ConnectionFailed {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// Reads lines until a complete reply. Malformed lines are logged and
/// skipped; EOF is an error, and so is a line longer than
/// [`MAX_REPLY_LINE`].
async fn read_reply_lines<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Reply> {
    let mut accumulator = ReplyAccumulator::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = (&mut *reader)
            .take(MAX_REPLY_LINE as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        if buf.len() > MAX_REPLY_LINE {
            return Err(Error::Protocol(format!(
                "reply line exceeds {MAX_REPLY_LINE} bytes"
            )));
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(parsed) => {
                if let Some(reply) = accumulator.push(parsed) {
                    return Ok(reply);
                }
            }
            Err(e) => warn!(error = %e, "skipping malformed reply line"),
        }
    }
}

fn server_error(reply: &Reply) -> Error {
    Error::ServerError {
        code: reply.code.as_u16(),
        message: reply.message_text(),
    }
}

fn auth_failed(reply: &Reply) -> Error {
    warn!(code = %reply.code, "authentication rejected");
    Error::AuthenticationFailed(format!("{} {}", reply.code, reply.message_text()))
}

fn send_failed(step: &str, reply: &Reply) -> Error {
    Error::SendFailed(format!(
        "{step} refused: {} {}",
        reply.code,
        reply.message_text()
    ))
}
