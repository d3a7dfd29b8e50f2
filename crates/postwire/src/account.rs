//! Account configuration.
//!
//! One account holds the IMAP and SMTP server settings and is stored as
//! JSON at `<config dir>/postwire/account.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Directory under the platform config dir.
const APP_DIR: &str = "postwire";

/// File name of the stored account.
const ACCOUNT_FILE: &str = "account.json";

/// Security/encryption mode for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Security {
    /// No encryption (not recommended).
    None,
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

impl Security {
    /// Get display name for the security mode.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::None => "None (insecure)",
            Self::Tls => "SSL/TLS",
            Self::StartTls => "STARTTLS",
        }
    }

    const fn imap(self) -> postwire_imap::Security {
        match self {
            Self::None => postwire_imap::Security::None,
            Self::Tls => postwire_imap::Security::Implicit,
            Self::StartTls => postwire_imap::Security::StartTls,
        }
    }

    const fn smtp(self) -> postwire_smtp::Security {
        match self {
            Self::None => postwire_smtp::Security::None,
            Self::Tls => postwire_smtp::Security::Implicit,
            Self::StartTls => postwire_smtp::Security::StartTls,
        }
    }
}

/// IMAP server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImapConfig {
    /// Server hostname.
    pub host: String,
    /// Server port; `0` selects the default for the security mode.
    #[serde(default)]
    pub port: u16,
    /// Security mode.
    #[serde(default)]
    pub security: Security,
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    #[serde(default)]
    pub password: String,
}

impl ImapConfig {
    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(security: Security) -> u16 {
        security.imap().default_port()
    }

    /// Returns the configured port, or the default for the security mode.
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        if self.port == 0 {
            Self::default_port(self.security)
        } else {
            self.port
        }
    }

    /// Builds the connection settings for the IMAP client.
    #[must_use]
    pub fn client_config(&self, command_timeout: Duration) -> postwire_imap::Config {
        postwire_imap::Config::builder(&self.host)
            .port(self.effective_port())
            .security(self.security.imap())
            .command_timeout(command_timeout)
            .build()
    }
}

/// SMTP server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port; `0` selects the default for the security mode.
    #[serde(default)]
    pub port: u16,
    /// Security mode.
    #[serde(default)]
    pub security: Security,
    /// Username for authentication. Empty disables AUTH.
    #[serde(default)]
    pub username: String,
    /// Password for authentication.
    #[serde(default)]
    pub password: String,
    /// Hostname announced in EHLO.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ehlo_hostname: Option<String>,
}

impl SmtpConfig {
    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(security: Security) -> u16 {
        security.smtp().default_port()
    }

    /// Returns the configured port, or the default for the security mode.
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        if self.port == 0 {
            Self::default_port(self.security)
        } else {
            self.port
        }
    }

    /// Builds the connection settings for the SMTP client.
    #[must_use]
    pub fn client_config(&self, command_timeout: Duration) -> postwire_smtp::Config {
        let mut builder = postwire_smtp::Config::builder(&self.host)
            .port(self.effective_port())
            .security(self.security.smtp())
            .command_timeout(command_timeout);
        if let Some(hostname) = &self.ehlo_hostname {
            builder = builder.ehlo_hostname(hostname.as_str());
        }
        builder.build()
    }
}

/// Validation error for account configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Email address is empty.
    #[error("Email address is required")]
    EmptyEmail,
    /// Email address format is invalid.
    #[error("Invalid email address format")]
    InvalidEmail,
    /// IMAP host is empty.
    #[error("IMAP server is required")]
    EmptyImapHost,
    /// IMAP username is empty.
    #[error("IMAP username is required")]
    EmptyImapUsername,
    /// SMTP host is empty.
    #[error("SMTP server is required")]
    EmptySmtpHost,
}

/// Email account configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Display name used in the From header.
    #[serde(default)]
    pub name: String,
    /// Email address.
    pub email: String,
    /// IMAP configuration.
    pub imap: ImapConfig,
    /// SMTP configuration.
    pub smtp: SmtpConfig,
    /// Per-command deadline in seconds for both protocols.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    60
}

impl Account {
    /// Create account with common defaults for well-known providers.
    #[must_use]
    pub fn with_email(email: &str) -> Self {
        let mut account = Self {
            email: email.to_string(),
            timeout_secs: default_timeout_secs(),
            ..Default::default()
        };

        if let Some(domain) = email.split('@').nth(1) {
            let domain = domain.to_lowercase();
            let (imap, smtp, smtp_security) = match domain.as_str() {
                "gmail.com" | "googlemail.com" => {
                    ("imap.gmail.com", "smtp.gmail.com", Security::Tls)
                }
                "outlook.com" | "hotmail.com" | "live.com" => (
                    "outlook.office365.com",
                    "smtp.office365.com",
                    Security::StartTls,
                ),
                "yahoo.com" | "ymail.com" => {
                    ("imap.mail.yahoo.com", "smtp.mail.yahoo.com", Security::Tls)
                }
                "icloud.com" | "me.com" | "mac.com" => {
                    ("imap.mail.me.com", "smtp.mail.me.com", Security::StartTls)
                }
                _ => {
                    account.imap.host = format!("imap.{domain}");
                    account.smtp.host = format!("smtp.{domain}");
                    ("", "", Security::StartTls)
                }
            };
            if !imap.is_empty() {
                account.imap.host = imap.to_string();
                account.smtp.host = smtp.to_string();
            }
            account.imap.security = Security::Tls;
            account.smtp.security = smtp_security;
        }

        account.imap.username = email.to_string();
        account.smtp.username = email.to_string();
        account
    }

    /// Returns the sender in `Name <addr>` form, or the bare address.
    #[must_use]
    pub fn sender(&self) -> String {
        if self.name.is_empty() {
            self.email.clone()
        } else {
            format!("{} <{}>", self.name, self.email)
        }
    }

    /// Returns the per-command deadline.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks the fields needed to connect.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::EmptyEmail);
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(ValidationError::InvalidEmail),
        }
        if self.imap.host.trim().is_empty() {
            return Err(ValidationError::EmptyImapHost);
        }
        if self.imap.username.trim().is_empty() {
            return Err(ValidationError::EmptyImapUsername);
        }
        if self.smtp.host.trim().is_empty() {
            return Err(ValidationError::EmptySmtpHost);
        }
        Ok(())
    }

    /// Returns `<config dir>/postwire/account.json`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the platform has no config directory.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(ACCOUNT_FILE))
            .ok_or_else(|| Error::Config("no configuration directory on this platform".into()))
    }

    /// Reads an account file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if the file does not exist, and
    /// an I/O or JSON error if it cannot be read.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::AccountNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let account: Self = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), email = %account.email, "account loaded");
        Ok(account)
    }

    /// Writes the account file, creating its directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        // The file holds passwords.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        info!(path = %path.display(), "account saved");
        Ok(())
    }
}
