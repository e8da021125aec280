//! Mail transport seam: connect, search, fetch, close.
//!
//! All calls are blocking; async callers run them on `spawn_blocking`.

use std::ops::{Deref, DerefMut};

use crate::error::TransportError;
use crate::mail::query::SearchCriteria;
use crate::mail::types::{MailboxCredential, MessageId};

/// Opens authenticated sessions against a mail server.
pub trait MailTransport: Send + Sync {
    /// Connect, authenticate and select the inbox read-only. No retry.
    fn connect(
        &self,
        credential: &MailboxCredential,
    ) -> Result<Box<dyn MailSession>, TransportError>;

    /// Host name, for log lines and status messages.
    fn host(&self) -> &str;
}

/// An authenticated mailbox session, valid for one request.
pub trait MailSession: Send {
    /// Identifiers of matching messages in server order. No match → empty vec.
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<MessageId>, TransportError>;

    /// Raw RFC 822 bytes of one message.
    fn fetch(&mut self, id: &MessageId) -> Result<Vec<u8>, TransportError>;

    /// Log out and disconnect. Errors are logged, not returned.
    fn close(self: Box<Self>);
}

/// Owns a session and closes it when dropped, on success and error paths alike.
pub struct ScopedSession {
    inner: Option<Box<dyn MailSession>>,
}

impl ScopedSession {
    pub fn new(session: Box<dyn MailSession>) -> Self {
        Self {
            inner: Some(session),
        }
    }
}

impl Deref for ScopedSession {
    type Target = dyn MailSession;

    fn deref(&self) -> &Self::Target {
        // `inner` is only taken in `drop`.
        match &self.inner {
            Some(session) => session.as_ref(),
            None => unreachable!("session used after release"),
        }
    }
}

impl DerefMut for ScopedSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.inner {
            Some(session) => session.as_mut(),
            None => unreachable!("session used after release"),
        }
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if let Some(session) = self.inner.take() {
            session.close();
        }
    }
}
