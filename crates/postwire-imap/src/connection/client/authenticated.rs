//! Mailbox listing, selection and logout.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::{Client, expect_ok};
use crate::command::Command;
use crate::connection::collector::CommandResult;
use crate::connection::state::{ProtocolState, SelectedState};
use crate::parser::{ParsedResponse, ResponseCode, StatusText};
use crate::types::{Folder, MailboxStatus};
use crate::{Error, Result};

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Lists mailboxes matching `pattern` under `reference`.
    ///
    /// `list("", "*")` returns every mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] before login and [`Error::ServerError`]
    /// if the server rejects the command.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<Folder>> {
        self.require_authenticated("LIST")?;
        let result = self
            .run_command(Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;
        expect_ok(&result, Error::ServerError)?;

        let folders: Vec<Folder> = result
            .untagged
            .into_iter()
            .filter_map(|r| match r {
                ParsedResponse::List(folder) => Some(folder),
                _ => None,
            })
            .collect();
        debug!(count = folders.len(), "listed folders");
        Ok(folders)
    }

    /// Opens a mailbox read-write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] if the server answers NO; the session
    /// then drops back to `Authenticated`.
    pub async fn select(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.open_mailbox(mailbox, false).await
    }

    /// Opens a mailbox read-only.
    ///
    /// # Errors
    ///
    /// Same as [`Client::select`].
    pub async fn examine(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.open_mailbox(mailbox, true).await
    }

    async fn open_mailbox(&mut self, mailbox: &str, read_only: bool) -> Result<MailboxStatus> {
        self.require_authenticated(if read_only { "EXAMINE" } else { "SELECT" })?;
        let command = if read_only {
            Command::Examine {
                mailbox: mailbox.to_string(),
            }
        } else {
            Command::Select {
                mailbox: mailbox.to_string(),
            }
        };
        let result = self.run_command(command).await?;

        // A failed SELECT leaves no mailbox selected, even one opened before.
        if let Err(e) = expect_ok(&result, |_| Error::FolderNotFound(mailbox.to_string())) {
            if self.state.is_selected() {
                self.state = ProtocolState::Authenticated;
            }
            return Err(e);
        }

        let status = mailbox_status(mailbox, &result, read_only);
        self.state = ProtocolState::Selected(SelectedState {
            mailbox: mailbox.to_string(),
            read_only: status.read_only,
        });
        info!(
            mailbox,
            exists = status.exists,
            read_only = status.read_only,
            "mailbox selected"
        );
        Ok(status)
    }

    /// Sends LOGOUT and closes the connection.
    ///
    /// The session ends in `Logout` whatever the server answers.
    ///
    /// # Errors
    ///
    /// Returns the command error, if any, after the connection is closed.
    pub async fn logout(&mut self) -> Result<()> {
        if !self.is_connected() {
            self.teardown().await;
            return Ok(());
        }
        let outcome = self
            .run_command(Command::Logout)
            .await
            .and_then(|result| expect_ok(&result, Error::ServerError));
        self.teardown().await;
        info!(host = %self.host, "logged out");
        outcome
    }

    /// Closes the connection without LOGOUT.
    pub async fn disconnect(&mut self) {
        if self.is_connected() {
            warn!(host = %self.host, "disconnecting without LOGOUT");
        }
        self.teardown().await;
    }
}

/// Builds the mailbox summary from SELECT/EXAMINE responses.
fn mailbox_status(name: &str, result: &CommandResult, read_only: bool) -> MailboxStatus {
    let mut status = MailboxStatus {
        name: name.to_string(),
        read_only,
        ..MailboxStatus::default()
    };
    for response in &result.untagged {
        match response {
            ParsedResponse::Exists(n) => status.exists = *n,
            ParsedResponse::Recent(n) => status.recent = *n,
            ParsedResponse::Flags(flags) => status.flags.clone_from(flags),
            ParsedResponse::Greeting(StatusText {
                code: Some(code), ..
            }) => apply_code(&mut status, code),
            _ => {}
        }
    }
    if let Some(code) = &result.tagged.code {
        apply_code(&mut status, code);
    }
    status
}

fn apply_code(status: &mut MailboxStatus, code: &ResponseCode) {
    match code {
        ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
        ResponseCode::UidNext(v) => status.uid_next = Some(*v),
        ResponseCode::Unseen(v) => status.unseen = Some(*v),
        ResponseCode::PermanentFlags(flags) => status.permanent_flags.clone_from(flags),
        ResponseCode::ReadOnly => status.read_only = true,
        _ => {}
    }
}
