//! Protocol state tracking.

/// Connection state as defined by RFC 3501 section 3.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProtocolState {
    /// Connected, waiting for LOGIN.
    #[default]
    NotAuthenticated,
    /// Logged in; LIST, SELECT and EXAMINE are valid.
    Authenticated,
    /// A mailbox is open; message commands are valid.
    Selected(SelectedState),
    /// LOGOUT sent, BYE received or connection torn down.
    Logout,
}

impl ProtocolState {
    /// Returns `true` if we're authenticated (authenticated or selected).
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Selected(_))
    }

    /// Returns `true` if a mailbox is selected.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        matches!(self, Self::Selected(_))
    }

    /// Returns the selected mailbox name, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        match self {
            Self::Selected(state) => Some(&state.mailbox),
            _ => None,
        }
    }

    /// Returns `true` if the selected mailbox is read-only.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        match self {
            Self::Selected(state) => state.read_only,
            _ => false,
        }
    }
}

/// State information when a mailbox is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedState {
    /// Name of the selected mailbox.
    pub mailbox: String,
    /// Whether the mailbox was opened with EXAMINE or reported READ-ONLY.
    pub read_only: bool,
}
