//! Connection setup and login.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::{Client, Greeting, expect_ok};
use crate::command::{Command, TagGenerator};
use crate::connection::config::{Config, Security};
use crate::connection::framed::FramedStream;
use crate::connection::state::ProtocolState;
use crate::connection::stream::{self, ImapStream};
use crate::parser::{ParsedResponse, ResponseCode, ResponseParser, Status, StatusText};
use crate::{Error, Result};

impl Client<ImapStream> {
    /// Connects to the server described by `config`.
    ///
    /// Opens the TCP (or TLS) stream, reads the greeting and, for
    /// [`Security::StartTls`], upgrades the connection before returning.
    /// Capabilities are requested if the greeting did not carry them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the server is unreachable or
    /// greets with BYE, [`Error::Timeout`] if the connect deadline expires and
    /// [`Error::Tls`] if STARTTLS or the handshake fails.
    pub async fn connect(config: &Config) -> Result<Self> {
        let stream = stream::open(config).await?;
        let mut framed = FramedStream::new(stream);
        let mut greeting = read_greeting(&mut framed, config).await?;
        let tags = TagGenerator::default();

        if config.security == Security::StartTls {
            if greeting.preauth {
                return Err(Error::Tls(
                    "server sent PREAUTH, STARTTLS is not possible".to_string(),
                ));
            }
            if !greeting.capabilities.is_empty()
                && !greeting
                    .capabilities
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case("STARTTLS"))
            {
                return Err(Error::Tls(
                    "server does not advertise STARTTLS".to_string(),
                ));
            }
            let plain = negotiate_starttls(framed, &tags, config).await?;
            let upgraded = tokio::time::timeout(
                config.connect_timeout,
                plain.upgrade_to_tls(&config.host),
            )
            .await
            .map_err(|_| Error::Timeout(config.connect_timeout))??;
            info!(host = %config.host, "STARTTLS negotiated");
            framed = FramedStream::new(upgraded);
            // Pre-TLS capabilities must not be trusted.
            greeting.capabilities.clear();
        }

        let mut client = Self::start(framed, tags, greeting, config);
        if client.capabilities.is_empty() {
            client.capability().await?;
        }
        Ok(client)
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Creates a client over an already connected stream.
    ///
    /// Reads the greeting within `config.connect_timeout`. No STARTTLS is
    /// attempted; the stream is used as given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the stream closes or the server
    /// greets with BYE, and [`Error::Timeout`] if no greeting arrives in time.
    pub async fn from_stream(stream: S, config: &Config) -> Result<Self> {
        let mut framed = FramedStream::new(stream);
        let greeting = read_greeting(&mut framed, config).await?;
        Ok(Self::start(framed, TagGenerator::default(), greeting, config))
    }

    /// Authenticates with LOGIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] if the server answers NO and
    /// [`Error::InvalidState`] if the session is already authenticated.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.ensure_connected()?;
        if self.state != ProtocolState::NotAuthenticated {
            return Err(Error::InvalidState(
                "LOGIN is only valid before authentication".to_string(),
            ));
        }

        let result = self
            .run_command(Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        expect_ok(&result, Error::AuthenticationFailed)?;

        if let Some(ResponseCode::Capability(caps)) = &result.tagged.code {
            self.capabilities.clone_from(caps);
        } else if let Some(caps) = result.untagged.iter().find_map(|r| match r {
            ParsedResponse::Capability(caps) => Some(caps),
            _ => None,
        }) {
            self.capabilities.clone_from(caps);
        }
        self.state = ProtocolState::Authenticated;
        info!(host = %self.host, "logged in");
        Ok(())
    }
}

/// Reads and interprets the first response on a new connection.
async fn read_greeting<S>(framed: &mut FramedStream<S>, config: &Config) -> Result<Greeting>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let raw = tokio::time::timeout(config.connect_timeout, framed.read_response())
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))??
        .ok_or_else(|| Error::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
        })?;

    match ResponseParser::parse(&raw) {
        ParsedResponse::Greeting(text) => Ok(Greeting {
            preauth: false,
            capabilities: greeting_capabilities(text),
        }),
        ParsedResponse::PreAuth(text) => Ok(Greeting {
            preauth: true,
            capabilities: greeting_capabilities(text),
        }),
        ParsedResponse::Bye(reason) => {
            warn!(host = %config.host, reason = %reason, "server refused connection");
            Err(Error::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
            })
        }
        other => Err(Error::Protocol(format!("unexpected greeting: {other:?}"))),
    }
}

fn greeting_capabilities(text: StatusText) -> Vec<String> {
    match text.code {
        Some(ResponseCode::Capability(caps)) => caps,
        _ => Vec::new(),
    }
}

/// Sends STARTTLS on the plaintext stream and hands the stream back once
/// the server agrees. Anything buffered past the OK is discarded.
async fn negotiate_starttls<S>(
    mut framed: FramedStream<S>,
    tags: &TagGenerator,
    config: &Config,
) -> Result<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let tag = tags
        .next()
        .ok_or_else(|| Error::Protocol("tag counter exhausted".to_string()))?;
    framed
        .write_command(&Command::StartTls.serialize(&tag)?)
        .await?;
    debug!(tag, "sent STARTTLS");

    loop {
        let raw = tokio::time::timeout(config.command_timeout, framed.read_response())
            .await
            .map_err(|_| Error::Timeout(config.command_timeout))??
            .ok_or_else(|| Error::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
            })?;
        match ResponseParser::parse(&raw) {
            ParsedResponse::Tagged(tagged) if tagged.tag == tag => {
                if tagged.status == Status::Ok {
                    break;
                }
                return Err(Error::Tls(format!(
                    "server refused STARTTLS: {}",
                    tagged.message
                )));
            }
            other => debug!(response = ?other, "ignoring response before STARTTLS completion"),
        }
    }

    let (stream, framer) = framed.into_parts();
    if framer.buffered() > 0 {
        warn!(
            bytes = framer.buffered(),
            "discarding plaintext received after STARTTLS"
        );
    }
    Ok(stream)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::builder("localhost")
            .security(Security::None)
            .build()
    }

    #[tokio::test]
    async fn greeting_with_capabilities() {
        let stream = tokio_test::io::Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 STARTTLS] ready\r\n")
            .build();
        let mut framed = FramedStream::new(stream);
        let greeting = read_greeting(&mut framed, &config()).await.unwrap();
        assert!(!greeting.preauth);
        assert_eq!(greeting.capabilities, vec!["IMAP4rev1", "STARTTLS"]);
    }

    #[tokio::test]
    async fn preauth_greeting() {
        let stream = tokio_test::io::Builder::new()
            .read(b"* PREAUTH welcome back\r\n")
            .build();
        let mut framed = FramedStream::new(stream);
        let greeting = read_greeting(&mut framed, &config()).await.unwrap();
        assert!(greeting.preauth);
    }

    #[tokio::test]
    async fn bye_greeting_fails() {
        let stream = tokio_test::io::Builder::new()
            .read(b"* BYE too many connections\r\n")
            .build();
        let mut framed = FramedStream::new(stream);
        let err = read_greeting(&mut framed, &config()).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn starttls_ok_returns_stream() {
        let stream = tokio_test::io::Builder::new()
            .write(b"A001 STARTTLS\r\n")
            .read(b"A001 OK begin TLS now\r\n")
            .build();
        let framed = FramedStream::new(stream);
        let tags = TagGenerator::default();
        assert!(negotiate_starttls(framed, &tags, &config()).await.is_ok());
    }

    #[tokio::test]
    async fn starttls_refused() {
        let stream = tokio_test::io::Builder::new()
            .write(b"A001 STARTTLS\r\n")
            .read(b"A001 BAD not now\r\n")
            .build();
        let framed = FramedStream::new(stream);
        let tags = TagGenerator::default();
        let err = negotiate_starttls(framed, &tags, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tls(msg) if msg.contains("not now")));
    }
}
