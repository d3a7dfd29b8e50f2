//! IMAP command builder.
//!
//! This module provides types and serialization for IMAP commands.

mod serialize;
mod tag_generator;
mod types;

use crate::Result;
use crate::types::{Flag, SequenceSet};

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, FetchItems, SearchCriteria, StoreMode};

use serialize::{write_astring, write_fetch_items, write_search_criteria, write_store_flags};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any State Commands
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,

    // Not Authenticated State Commands
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },

    // Authenticated State Commands
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: String,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: String,
    },
    /// LIST command.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },

    // Selected State Commands
    /// CLOSE command.
    Close,
    /// EXPUNGE command.
    Expunge,
    /// SEARCH command.
    Search {
        /// Search criteria.
        criteria: SearchCriteria,
        /// Use UIDs.
        uid: bool,
    },
    /// FETCH command.
    Fetch {
        /// Sequence set.
        sequence: SequenceSet,
        /// Items to fetch.
        items: FetchItems,
        /// Use UIDs.
        uid: bool,
    },
    /// STORE command.
    Store {
        /// Sequence set.
        sequence: SequenceSet,
        /// How the flags are applied.
        mode: StoreMode,
        /// Flags to apply.
        flags: Vec<Flag>,
        /// Use UIDs.
        uid: bool,
    },
    /// COPY command.
    Copy {
        /// Sequence set.
        sequence: SequenceSet,
        /// Target mailbox.
        mailbox: String,
        /// Use UIDs.
        uid: bool,
    },
}

impl Command {
    /// Returns the command verb, with `UID` prefix where applicable.
    ///
    /// Safe to log: never includes arguments.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::List { .. } => "LIST",
            Self::Close => "CLOSE",
            Self::Expunge => "EXPUNGE",
            Self::Search { uid: false, .. } => "SEARCH",
            Self::Search { uid: true, .. } => "UID SEARCH",
            Self::Fetch { uid: false, .. } => "FETCH",
            Self::Fetch { uid: true, .. } => "UID FETCH",
            Self::Store { uid: false, .. } => "STORE",
            Self::Store { uid: true, .. } => "UID STORE",
            Self::Copy { uid: false, .. } => "COPY",
            Self::Copy { uid: true, .. } => "UID COPY",
        }
    }

    /// Serializes the command to `TAG COMMAND ARGS\r\n`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Protocol`] if a string argument contains CR or LF.
    pub fn serialize(&self, tag: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.name().as_bytes());

        match self {
            Self::Capability
            | Self::Noop
            | Self::Logout
            | Self::StartTls
            | Self::Close
            | Self::Expunge => {}

            Self::Login { username, password } => {
                buf.push(b' ');
                write_astring(&mut buf, username)?;
                buf.push(b' ');
                write_astring(&mut buf, password)?;
            }

            Self::Select { mailbox } | Self::Examine { mailbox } => {
                buf.push(b' ');
                write_astring(&mut buf, mailbox)?;
            }

            Self::List { reference, pattern } => {
                buf.push(b' ');
                write_astring(&mut buf, reference)?;
                buf.push(b' ');
                write_astring(&mut buf, pattern)?;
            }

            Self::Search { criteria, .. } => {
                buf.push(b' ');
                write_search_criteria(&mut buf, criteria)?;
            }

            Self::Fetch {
                sequence, items, ..
            } => {
                buf.push(b' ');
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_items(&mut buf, items);
            }

            Self::Store {
                sequence,
                mode,
                flags,
                ..
            } => {
                buf.push(b' ');
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_store_flags(&mut buf, mode.as_str(), flags);
            }

            Self::Copy {
                sequence, mailbox, ..
            } => {
                buf.push(b' ');
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_astring(&mut buf, mailbox)?;
            }
        }

        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }
}
