//! SMTP connection management.

mod client;
mod config;
mod state;
mod stream;

pub use client::Client;
pub use config::{
    Config, ConfigBuilder, DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, Security,
};
pub use state::SmtpState;
pub use stream::{SmtpStream, open};

use crate::types::{AuthMechanism, Extension, Reply};

/// What the server announced in its greeting and EHLO reply.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Full greeting text.
    pub greeting: String,
    /// Server hostname from greeting.
    pub hostname: String,
    /// Extensions from the latest EHLO, in announcement order.
    pub extensions: Vec<Extension>,
}

impl ServerInfo {
    /// Replaces the extension list with the keyword lines of an EHLO reply.
    pub fn update_from_ehlo(&mut self, reply: &Reply) {
        // The first line is the server's greeting, not a keyword.
        self.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
    }

    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Checks if SIZE was advertised, with or without a limit.
    #[must_use]
    pub fn supports_size(&self) -> bool {
        self.extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Size(_)))
    }

    /// Returns the advertised size limit. `SIZE 0` means no limit.
    #[must_use]
    pub fn size_limit(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(Some(limit)) if *limit > 0 => Some(*limit),
            _ => None,
        })
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .filter_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReplyCode;

    fn ehlo(lines: &[&str]) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.update_from_ehlo(&Reply::new(
            ReplyCode::OK,
            lines.iter().map(ToString::to_string).collect(),
        ));
        info
    }

    #[test]
    fn extensions_from_ehlo() {
        let info = ehlo(&[
            "smtp.example.com Hello",
            "SIZE 35882577",
            "8BITMIME",
            "AUTH LOGIN PLAIN XOAUTH2",
            "STARTTLS",
            "PIPELINING",
        ]);
        assert!(info.supports_starttls());
        assert!(info.supports(&Extension::EightBitMime));
        assert!(info.supports(&Extension::Pipelining));
        assert_eq!(info.size_limit(), Some(35_882_577));
        assert_eq!(
            info.auth_mechanisms(),
            vec![AuthMechanism::Login, AuthMechanism::Plain, AuthMechanism::XOAuth2]
        );
    }

    #[test]
    fn greeting_line_is_not_an_extension() {
        let info = ehlo(&["STARTTLS"]);
        assert!(!info.supports_starttls());
    }

    #[test]
    fn size_zero_is_unlimited() {
        let info = ehlo(&["host", "SIZE 0"]);
        assert!(info.supports_size());
        assert_eq!(info.size_limit(), None);
        assert!(!ehlo(&["host"]).supports_size());
    }
}
