//! Core IMAP types.

mod flags;
mod mailbox;
mod sequence;

pub use flags::{Flag, format_flag_list};
pub use mailbox::{Folder, MailboxAttribute, MailboxStatus};
pub use sequence::{SequenceSet, UidSet};
