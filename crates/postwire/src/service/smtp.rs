//! SMTP service for sending emails.
//!
//! Builds the MIME message, connects with the account's settings,
//! authenticates and submits it.

use postwire_mime::{MessageBuilder, OutgoingAttachment};
use postwire_smtp::{Address, Client};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::account::{Account, SmtpConfig};

/// Errors that can occur during SMTP operations.
#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Send failed.
    #[error("Send failed: {0}")]
    Send(String),

    /// The server refused a recipient.
    #[error("Recipient rejected: {0}")]
    RecipientRejected(String),

    /// The message exceeds the server's SIZE limit.
    #[error("Message too large: {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge {
        /// Message size in bytes.
        size: usize,
        /// Server limit in bytes.
        limit: usize,
    },

    /// Invalid address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The message could not be composed.
    #[error("Message could not be built: {0}")]
    Compose(#[from] postwire_mime::Error),
}

impl From<postwire_smtp::Error> for SmtpError {
    fn from(err: postwire_smtp::Error) -> Self {
        use postwire_smtp::Error as Smtp;
        match err {
            Smtp::ConnectionFailed { .. }
            | Smtp::Tls(_)
            | Smtp::NetworkUnavailable(_)
            | Smtp::Timeout(_) => Self::Connection(err.to_string()),
            Smtp::AuthenticationFailed(reason) => Self::Authentication(reason),
            Smtp::RecipientRejected(email) => Self::RecipientRejected(email),
            Smtp::MessageTooLarge { size, limit } => Self::MessageTooLarge { size, limit },
            Smtp::InvalidAddress(reason) => Self::InvalidAddress(reason),
            other => Self::Send(other.to_string()),
        }
    }
}

/// An email message to send.
///
/// Unlike [`MessageBuilder`], which writes a `Bcc:` header when given Bcc
/// recipients, [`OutgoingMessage::prepare`] never emits one: Bcc addresses
/// go on the SMTP envelope only, so To and Cc recipients cannot see them.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    /// Sender, in `Name <addr>` or bare form.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// BCC addresses. They reach the envelope but not the headers.
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// Optional HTML alternative.
    pub html_body: Option<String>,
    /// Attachments.
    pub attachments: Vec<OutgoingAttachment>,
}

impl OutgoingMessage {
    /// Creates a new outgoing message.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            subject: subject.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.bcc.push(recipient.into());
        self
    }

    /// Sets the HTML alternative.
    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: OutgoingAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Builds the wire form of the message and its SMTP envelope.
    ///
    /// Bcc recipients are added to the envelope only.
    ///
    /// # Errors
    ///
    /// Returns [`SmtpError::InvalidAddress`] if there are no recipients or an
    /// address is malformed, and [`SmtpError::Compose`] if MIME generation
    /// fails.
    pub fn prepare(&self) -> Result<PreparedMessage, SmtpError> {
        if self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(SmtpError::InvalidAddress("No recipients specified".into()));
        }

        let mut builder = MessageBuilder::new()
            .from(&self.from)
            .subject(self.subject.as_str())
            .text_body(self.body.as_str());
        for to in &self.to {
            builder = builder.to(to);
        }
        for cc in &self.cc {
            builder = builder.cc(cc);
        }
        if let Some(html) = &self.html_body {
            builder = builder.html_body(html.as_str());
        }
        for attachment in &self.attachments {
            builder = builder.attach(attachment.clone());
        }

        let from = envelope_address(builder.sender().unwrap_or_default())?;
        let mut recipients = builder
            .recipients()
            .into_iter()
            .map(envelope_address)
            .collect::<Result<Vec<_>, _>>()?;
        for bcc in &self.bcc {
            let mailbox = postwire_mime::Mailbox::parse(bcc)
                .ok_or_else(|| SmtpError::InvalidAddress(bcc.clone()))?;
            recipients.push(envelope_address(&mailbox.address)?);
        }

        let data = builder.build()?;
        Ok(PreparedMessage {
            from,
            recipients,
            data,
        })
    }
}

/// A composed message ready for submission.
#[derive(Debug, Clone)]
pub struct PreparedMessage {
    /// MAIL FROM address.
    pub from: Address,
    /// RCPT TO addresses, Bcc included.
    pub recipients: Vec<Address>,
    /// RFC 5322 message with CRLF line endings.
    pub data: Vec<u8>,
}

fn envelope_address(address: &str) -> Result<Address, SmtpError> {
    Address::new(address).map_err(|e| SmtpError::InvalidAddress(e.to_string()))
}

/// Send an email using the account's SMTP settings.
///
/// # Errors
///
/// Returns an error if composition, connection, authentication or sending
/// fails. Nothing is sent when the message cannot be composed.
pub async fn send_email(account: &Account, message: &OutgoingMessage) -> Result<(), SmtpError> {
    let prepared = message.prepare()?;

    let config = account.smtp.client_config(account.command_timeout());
    info!(
        host = %config.host,
        port = config.port,
        security = account.smtp.security.display_name(),
        "connecting to SMTP server"
    );
    let mut client = Client::connect(&config).await?;

    submit(&mut client, &account.smtp, &prepared).await?;

    // The message is accepted at this point.
    if let Err(e) = client.quit().await {
        warn!(error = %e, "QUIT failed after successful delivery");
    }
    Ok(())
}

/// Authenticates on a client that has completed EHLO and submits a
/// prepared message.
///
/// AUTH is skipped when the configured username is empty.
///
/// # Errors
///
/// Returns [`SmtpError::Authentication`] if the credentials are rejected and
/// a send error if the transaction fails.
pub async fn submit<S>(
    client: &mut Client<S>,
    smtp: &SmtpConfig,
    message: &PreparedMessage,
) -> Result<(), SmtpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if smtp.username.is_empty() {
        debug!("no SMTP username configured, skipping AUTH");
    } else {
        client.authenticate(&smtp.username, &smtp.password).await?;
    }

    client
        .send(&message.from, &message.recipients, &message.data)
        .await?;
    info!(
        recipients = message.recipients.len(),
        bytes = message.data.len(),
        "message sent"
    );
    Ok(())
}
