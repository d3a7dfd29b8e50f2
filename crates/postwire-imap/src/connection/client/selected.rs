//! Message operations on the selected mailbox.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::{Client, expect_ok};
use crate::command::{Command, FetchAttribute, FetchItems, SearchCriteria, StoreMode};
use crate::connection::collector::CommandResult;
use crate::connection::state::ProtocolState;
use crate::parser::{FetchData, ParsedResponse};
use crate::types::{Flag, SequenceSet, UidSet};
use crate::{Error, Result};

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Fetches message data by sequence number.
    ///
    /// Returns `(sequence number, data)` pairs in server order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFolderSelected`] outside the selected state and
    /// [`Error::MessageFetchFailed`] if the server answers NO.
    pub async fn fetch(
        &mut self,
        sequence: &SequenceSet,
        items: FetchItems,
    ) -> Result<Vec<(u32, FetchData)>> {
        self.fetch_inner(sequence, items, false).await
    }

    /// Fetches message data by UID.
    ///
    /// # Errors
    ///
    /// Same as [`Client::fetch`].
    pub async fn uid_fetch(
        &mut self,
        uids: &UidSet,
        items: FetchItems,
    ) -> Result<Vec<(u32, FetchData)>> {
        self.fetch_inner(uids, items, true).await
    }

    async fn fetch_inner(
        &mut self,
        sequence: &SequenceSet,
        items: FetchItems,
        uid: bool,
    ) -> Result<Vec<(u32, FetchData)>> {
        self.require_selected()?;
        let result = self
            .run_command(Command::Fetch {
                sequence: sequence.clone(),
                items,
                uid,
            })
            .await?;
        expect_ok(&result, Error::MessageFetchFailed)?;
        Ok(fetched(result))
    }

    /// Downloads the full RFC 822 source of one message, setting `\Seen`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageFetchFailed`] if the server answers NO or
    /// returns no body for `uid`.
    pub async fn fetch_body(&mut self, uid: u32) -> Result<Vec<u8>> {
        self.fetch_full(uid, false).await
    }

    /// Like [`Client::fetch_body`], without setting `\Seen`.
    ///
    /// # Errors
    ///
    /// Same as [`Client::fetch_body`].
    pub async fn fetch_body_peek(&mut self, uid: u32) -> Result<Vec<u8>> {
        self.fetch_full(uid, true).await
    }

    async fn fetch_full(&mut self, uid: u32, peek: bool) -> Result<Vec<u8>> {
        let items = FetchItems::Items(vec![FetchAttribute::Body {
            section: None,
            peek,
        }]);
        let messages = self.uid_fetch(&UidSet::Single(uid), items).await?;
        let count = messages.len();
        let body = messages
            .into_iter()
            .map(|(_, data)| data)
            .filter(|data| data.uid.is_none_or(|u| u == uid))
            .find_map(|data| data.rfc822);
        match body {
            Some(body) => {
                debug!(uid, bytes = body.len(), "fetched message body");
                Ok(body)
            }
            None => Err(Error::MessageFetchFailed(format!(
                "no body returned for UID {uid} ({count} FETCH responses)"
            ))),
        }
    }

    /// Searches the mailbox, returning sequence numbers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFolderSelected`] outside the selected state and
    /// [`Error::ServerError`] if the server rejects the criteria.
    pub async fn search(&mut self, criteria: SearchCriteria) -> Result<Vec<u32>> {
        self.search_inner(criteria, false).await
    }

    /// Searches the mailbox, returning UIDs.
    ///
    /// # Errors
    ///
    /// Same as [`Client::search`].
    pub async fn uid_search(&mut self, criteria: SearchCriteria) -> Result<Vec<u32>> {
        self.search_inner(criteria, true).await
    }

    async fn search_inner(&mut self, criteria: SearchCriteria, uid: bool) -> Result<Vec<u32>> {
        self.require_selected()?;
        let result = self
            .run_command(Command::Search { criteria, uid })
            .await?;
        expect_ok(&result, Error::ServerError)?;
        Ok(result
            .untagged
            .into_iter()
            .filter_map(|r| match r {
                ParsedResponse::Search(ids) => Some(ids),
                _ => None,
            })
            .flatten()
            .collect())
    }

    /// Changes flags by sequence number and returns the updated flags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFolderSelected`] outside the selected state,
    /// [`Error::InvalidState`] on a read-only mailbox and
    /// [`Error::ServerError`] if the server refuses.
    pub async fn store(
        &mut self,
        sequence: &SequenceSet,
        mode: StoreMode,
        flags: &[Flag],
    ) -> Result<Vec<(u32, FetchData)>> {
        self.store_inner(sequence, mode, flags, false).await
    }

    /// Changes flags by UID and returns the updated flags.
    ///
    /// # Errors
    ///
    /// Same as [`Client::store`].
    pub async fn uid_store(
        &mut self,
        uids: &UidSet,
        mode: StoreMode,
        flags: &[Flag],
    ) -> Result<Vec<(u32, FetchData)>> {
        self.store_inner(uids, mode, flags, true).await
    }

    /// Adds, removes or replaces flags on the given UIDs.
    ///
    /// # Errors
    ///
    /// Same as [`Client::store`].
    pub async fn store_flags(&mut self, uids: &UidSet, flags: &[Flag], mode: StoreMode) -> Result<()> {
        self.uid_store(uids, mode, flags).await.map(|_| ())
    }

    async fn store_inner(
        &mut self,
        sequence: &SequenceSet,
        mode: StoreMode,
        flags: &[Flag],
        uid: bool,
    ) -> Result<Vec<(u32, FetchData)>> {
        self.require_writable("STORE")?;
        let result = self
            .run_command(Command::Store {
                sequence: sequence.clone(),
                mode,
                flags: flags.to_vec(),
                uid,
            })
            .await?;
        expect_ok(&result, Error::ServerError)?;
        Ok(fetched(result))
    }

    /// Removes `\Deleted` messages and returns the expunged sequence numbers
    /// in the order the server reported them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFolderSelected`] outside the selected state and
    /// [`Error::InvalidState`] on a read-only mailbox.
    pub async fn expunge(&mut self) -> Result<Vec<u32>> {
        self.require_writable("EXPUNGE")?;
        let result = self.run_command(Command::Expunge).await?;
        expect_ok(&result, Error::ServerError)?;
        let expunged: Vec<u32> = result
            .untagged
            .iter()
            .filter_map(|r| match r {
                ParsedResponse::Expunge(n) => Some(*n),
                _ => None,
            })
            .collect();
        info!(count = expunged.len(), "expunged messages");
        Ok(expunged)
    }

    /// Copies messages by sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFolderSelected`] outside the selected state and
    /// [`Error::FolderNotFound`] if the server answers NO.
    pub async fn copy(&mut self, sequence: &SequenceSet, mailbox: &str) -> Result<()> {
        self.copy_inner(sequence, mailbox, false).await
    }

    /// Copies messages by UID.
    ///
    /// # Errors
    ///
    /// Same as [`Client::copy`].
    pub async fn uid_copy(&mut self, uids: &UidSet, mailbox: &str) -> Result<()> {
        self.copy_inner(uids, mailbox, true).await
    }

    /// Copies the given UIDs to `mailbox`.
    ///
    /// # Errors
    ///
    /// Same as [`Client::copy`].
    pub async fn copy_messages(&mut self, uids: &UidSet, mailbox: &str) -> Result<()> {
        self.uid_copy(uids, mailbox).await
    }

    async fn copy_inner(&mut self, sequence: &SequenceSet, mailbox: &str, uid: bool) -> Result<()> {
        self.require_selected()?;
        let result = self
            .run_command(Command::Copy {
                sequence: sequence.clone(),
                mailbox: mailbox.to_string(),
                uid,
            })
            .await?;
        expect_ok(&result, |_| Error::FolderNotFound(mailbox.to_string()))
    }

    /// Moves messages: UID COPY to `mailbox`, then `+FLAGS (\Deleted)` on
    /// the source. The source is not expunged.
    ///
    /// # Errors
    ///
    /// Fails like [`Client::copy`]; if the copy fails nothing is flagged.
    pub async fn move_messages(&mut self, uids: &UidSet, mailbox: &str) -> Result<()> {
        self.require_writable("MOVE")?;
        self.uid_copy(uids, mailbox).await?;
        self.uid_store(uids, StoreMode::Add, &[Flag::Deleted])
            .await?;
        info!(uids = %uids, destination = mailbox, "moved messages");
        Ok(())
    }

    /// Closes the mailbox, expunging `\Deleted` messages when it was opened
    /// read-write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFolderSelected`] outside the selected state.
    pub async fn close(&mut self) -> Result<()> {
        self.require_selected()?;
        let result = self.run_command(Command::Close).await?;
        expect_ok(&result, Error::ServerError)?;
        if self.state.is_selected() {
            self.state = ProtocolState::Authenticated;
        }
        Ok(())
    }
}

fn fetched(result: CommandResult) -> Vec<(u32, FetchData)> {
    result
        .untagged
        .into_iter()
        .filter_map(|r| match r {
            ParsedResponse::Fetch(seq, data) => Some((seq, *data)),
            _ => None,
        })
        .collect()
}
