//! Configuration model.

use std::path::Path;
use std::time::Duration;

use mailsift_imap::{Config, SessionConfig};
use serde::{Deserialize, Serialize};

use super::validation::validate_config;
use crate::Result;

/// Mailbox searched when the configuration names none.
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// Header carrying the caller's correlation key.
pub const DEFAULT_KEY_HEADER: &str = "X-Mailsift-Key";

/// Settings for one mail account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailConfig {
    /// Verbose logging.
    #[serde(default)]
    pub debug: bool,
    /// Login name.
    pub username: String,
    /// Login password.
    #[serde(default)]
    pub password: String,
    /// Server hostname.
    pub host: String,
    /// Server port (implicit TLS).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Mailbox to search.
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    /// Header read into [`SearchResult::key`](crate::SearchResult::key).
    #[serde(default = "default_key_header")]
    pub key_header: String,
    /// Deadline for TCP connect plus TLS handshake, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Deadline for each IMAP command, in seconds. Unset waits indefinitely.
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

const fn default_port() -> u16 {
    mailsift_imap::connection::DEFAULT_PORT
}

fn default_mailbox() -> String {
    DEFAULT_MAILBOX.to_string()
}

fn default_key_header() -> String {
    DEFAULT_KEY_HEADER.to_string()
}

const fn default_connect_timeout() -> u64 {
    mailsift_imap::connection::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

impl MailConfig {
    /// Creates a configuration with defaults for everything but the
    /// server and credentials.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            debug: false,
            username: username.into(),
            password: password.into(),
            host: host.into(),
            port: default_port(),
            mailbox: default_mailbox(),
            key_header: default_key_header(),
            connect_timeout_secs: default_connect_timeout(),
            command_timeout_secs: None,
        }
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serde`](crate::Error::Serde) for malformed JSON and
    /// [`Error::Config`](crate::Error::Config) when validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the file cannot be read,
    /// otherwise the errors of [`MailConfig::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Builds the IMAP session settings.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let server = Config::builder(&self.host)
            .port(self.port)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .build();
        let session = SessionConfig::from_server(server);
        match self.command_timeout_secs {
            Some(secs) => session.command_timeout(Duration::from_secs(secs)),
            None => session,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_defaults_applied() {
        let config =
            MailConfig::from_json(r#"{"username": "me", "password": "pw", "host": "imap.test"}"#)
                .unwrap();
        assert_eq!(config.port, 993);
        assert_eq!(config.mailbox, "INBOX");
        assert_eq!(config.key_header, "X-Mailsift-Key");
        assert_eq!(config.connect_timeout_secs, 30);
        assert!(!config.debug);
        assert_eq!(config, MailConfig::new("imap.test", "me", "pw"));
    }

    #[test]
    fn test_explicit_values() {
        let config = MailConfig::from_json(
            r#"{"debug": true, "username": "me", "password": "pw", "host": "imap.test",
                "port": 1993, "mailbox": "Archive", "key_header": "X-Ticket",
                "command_timeout_secs": 5}"#,
        )
        .unwrap();
        assert!(config.debug);
        assert_eq!(config.mailbox, "Archive");

        let session = config.session_config();
        assert_eq!(session.server.host, "imap.test");
        assert_eq!(session.server.port, 1993);
        assert_eq!(session.command_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = MailConfig::from_json(r#"{"username": " ", "host": ""}"#).unwrap_err();
        let Error::Config(message) = err else {
            panic!("expected config error, got {err:?}");
        };
        assert!(message.contains("server"));
        assert!(message.contains("username"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            MailConfig::from_json("{not json"),
            Err(Error::Serde(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MailConfig::from_file("/nonexistent/mailsift.json"),
            Err(Error::Io(_))
        ));
    }
}
