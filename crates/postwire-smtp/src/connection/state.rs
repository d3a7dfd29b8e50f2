//! SMTP session state.

/// Where the session is in its lifecycle.
///
/// The only edges are forward ones plus a jump to `Disconnected` on QUIT
/// or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpState {
    /// No greeting received yet.
    #[default]
    NotConnected,
    /// 220 greeting received.
    Connected,
    /// EHLO accepted; extensions known.
    Ready,
    /// AUTH succeeded.
    Authenticated,
    /// QUIT sent or the connection failed.
    Disconnected,
}

impl SmtpState {
    /// Returns true if a mail transaction may start.
    #[must_use]
    pub const fn can_send(self) -> bool {
        matches!(self, Self::Ready | Self::Authenticated)
    }
}
