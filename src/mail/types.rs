//! Mail pipeline records: credential, message identifiers, normalized messages.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use secrecy::SecretString;
use serde::Serialize;

/// Login for the mailbox. Lives for the whole process; the secret is never logged.
#[derive(Debug, Clone)]
pub struct MailboxCredential {
    username: String,
    secret: SecretString,
}

impl MailboxCredential {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

/// Transport-assigned message identifier (an IMAP UID).
///
/// Only meaningful inside the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cleaned email, ready for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMessage {
    pub id: MessageId,
    /// `None` when the Date header is missing or unparsable.
    pub sent_at: Option<DateTime<FixedOffset>>,
    /// Date header as sent, shown in place of `sent_at` when that is `None`.
    pub date_header: Option<String>,
    pub sender: String,
    pub subject: String,
    /// Plain-text body with signatures and legal footers cut off.
    pub body: String,
}
