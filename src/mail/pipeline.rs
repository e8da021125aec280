//! Search + fetch + extract over one mailbox session.
//!
//! Blocking; async callers wrap [`collect_messages`] in `spawn_blocking`.

use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::mail::extract::extract;
use crate::mail::query::SearchCriteria;
use crate::mail::transport::{MailTransport, ScopedSession};
use crate::mail::types::{MailboxCredential, NormalizedMessage};

/// Connect, search and fetch every match in server order.
///
/// Connection, login and search failures abort the run. A message that fails
/// to fetch or parse is skipped with a warning. The session is closed on
/// every exit path.
pub fn collect_messages(
    transport: &dyn MailTransport,
    credential: &MailboxCredential,
    criteria: &SearchCriteria,
) -> Result<Vec<NormalizedMessage>, TransportError> {
    let mut session = ScopedSession::new(transport.connect(credential)?);

    let ids = session.search(criteria)?;
    info!(host = transport.host(), criteria = %criteria, matches = ids.len(), "Mailbox search done");

    let mut messages = Vec::with_capacity(ids.len());
    for id in &ids {
        let raw = match session.fetch(id) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(uid = %id, error = %e, "Fetch failed; skipping message");
                continue;
            }
        };
        match extract(&raw, id) {
            Some(message) => messages.push(message),
            None => debug!(uid = %id, bytes = raw.len(), "Extractor rejected message"),
        }
    }

    Ok(messages)
}
