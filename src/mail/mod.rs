//! Mailbox side of the service: query planning, IMAP transport, message
//! extraction and transcript assembly.

pub mod aggregate;
pub mod extract;
pub mod imap;
pub mod pipeline;
pub mod query;
pub mod transport;
pub mod types;

pub use aggregate::{MAX_TRANSCRIPT_CHARS, MESSAGE_SEPARATOR, Transcript, aggregate, truncate_chars};
pub use imap::ImapTransport;
pub use pipeline::collect_messages;
pub use query::{PlannedSearch, Rejected, SearchCriteria, build_criteria};
pub use transport::{MailSession, MailTransport, ScopedSession};
pub use types::{MailboxCredential, MessageId, NormalizedMessage};
