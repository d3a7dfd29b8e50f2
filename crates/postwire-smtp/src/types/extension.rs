//! EHLO keywords.

use std::fmt;

/// One service extension advertised in an EHLO reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// `STARTTLS` (RFC 3207).
    StartTls,
    /// `AUTH` with the SASL mechanisms this client recognizes.
    Auth(Vec<AuthMechanism>),
    /// `SIZE`, with the limit in bytes when one is given (RFC 1870).
    Size(Option<usize>),
    /// `8BITMIME`.
    EightBitMime,
    /// `PIPELINING`.
    Pipelining,
    /// `SMTPUTF8`.
    SmtpUtf8,
    /// Any other keyword line, kept verbatim.
    Unknown(String),
}

impl Extension {
    /// Parses one EHLO keyword line.
    ///
    /// The legacy `AUTH=LOGIN PLAIN` spelling is treated like `AUTH`.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (keyword, params) = match line.split_once([' ', '=']) {
            Some((keyword, params)) => (keyword, params.trim()),
            None => (line, ""),
        };

        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(
                params
                    .split_whitespace()
                    .filter_map(AuthMechanism::parse)
                    .collect(),
            ),
            "SIZE" => Self::Size(params.split_whitespace().next().and_then(|n| n.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "SMTPUTF8" => Self::SmtpUtf8,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// SASL mechanism named in an `AUTH` keyword line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// `PLAIN` (RFC 4616).
    Plain,
    /// `LOGIN`.
    Login,
    /// `CRAM-MD5`. Recognized, never used.
    CramMd5,
    /// `XOAUTH2`. Recognized, never used.
    XOAuth2,
}

impl AuthMechanism {
    /// Parses a mechanism name, ignoring case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        [Self::Plain, Self::Login, Self::CramMd5, Self::XOAuth2]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }

    /// Returns the mechanism name as sent in `AUTH`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
            Self::XOAuth2 => "XOAUTH2",
        }
    }

    /// Returns true if [`Client::authenticate`](crate::Client::authenticate)
    /// can use this mechanism.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Plain | Self::Login)
    }
}

impl fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
