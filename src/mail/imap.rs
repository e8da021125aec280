//! IMAP transport: raw IMAP4rev1 over TLS via rustls.
//!
//! Blocking I/O; run inside `spawn_blocking`. Only the handful of commands
//! the digest pipeline needs: LOGIN, EXAMINE, UID SEARCH, UID FETCH, LOGOUT.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use rustls_pki_types::ServerName;
use secrecy::ExposeSecret;

use crate::error::TransportError;
use crate::mail::query::{SearchCriteria, quote_imap_string};
use crate::mail::transport::{MailSession, MailTransport};
use crate::mail::types::{MailboxCredential, MessageId};

/// Socket read/write timeout.
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Refuse literals larger than this (a single message body).
const MAX_LITERAL_BYTES: usize = 64 * 1024 * 1024;

// ── Transport ───────────────────────────────────────────────────────

/// Connects to an IMAP server over implicit TLS (port 993 by default).
#[derive(Debug, Clone)]
pub struct ImapTransport {
    host: String,
    port: u16,
}

impl ImapTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl MailTransport for ImapTransport {
    fn connect(
        &self,
        credential: &MailboxCredential,
    ) -> Result<Box<dyn MailSession>, TransportError> {
        tracing::info!(
            host = %self.host,
            port = self.port,
            user = credential.username(),
            "Connecting to IMAP server"
        );

        let tcp = TcpStream::connect((self.host.as_str(), self.port)).map_err(|source| {
            TransportError::Connect {
                host: self.host.clone(),
                port: self.port,
                source,
            }
        })?;
        tcp.set_read_timeout(Some(IO_TIMEOUT))?;
        tcp.set_write_timeout(Some(IO_TIMEOUT))?;

        let tls = tls_stream(&self.host, tcp)?;
        let session = ImapSession::open(tls, credential)?;
        tracing::info!(host = %self.host, "IMAP login succeeded");
        Ok(Box::new(session))
    }

    fn host(&self) -> &str {
        &self.host
    }
}

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

fn tls_stream(host: &str, tcp: TcpStream) -> Result<TlsStream, TransportError> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Tls(e.to_string()))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| TransportError::Tls(format!("invalid server name {host:?}: {e}")))?;
    let conn = rustls::ClientConnection::new(Arc::new(tls_config), server_name)
        .map_err(|e| TransportError::Tls(e.to_string()))?;

    Ok(rustls::StreamOwned::new(conn, tcp))
}

// ── Wire protocol ───────────────────────────────────────────────────

/// One command argument.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    /// Sent verbatim.
    Atom(String),
    /// Sent as `{len}` + continuation + raw bytes.
    Literal(Vec<u8>),
}

fn atom(s: &str) -> Arg {
    Arg::Atom(s.to_string())
}

/// Quoted string when safe, literal otherwise (non-ASCII, CR/LF).
fn astring(value: &str) -> Arg {
    if value.is_ascii() && !value.contains(['\r', '\n']) {
        Arg::Atom(quote_imap_string(value))
    } else {
        Arg::Literal(value.as_bytes().to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    No,
    Bad,
}

/// A logical response line, with any literals embedded in it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ResponseLine {
    text: String,
    literals: Vec<Vec<u8>>,
}

/// Everything the server sent for one tagged command.
#[derive(Debug)]
struct Response {
    untagged: Vec<ResponseLine>,
    status: Status,
    text: String,
}

impl Response {
    fn completed(untagged: Vec<ResponseLine>, tagged_rest: &str) -> Result<Self, TransportError> {
        let (word, text) = tagged_rest.split_once(' ').unwrap_or((tagged_rest, ""));
        let status = match word.to_ascii_uppercase().as_str() {
            "OK" => Status::Ok,
            "NO" => Status::No,
            "BAD" => Status::Bad,
            other => {
                return Err(TransportError::Protocol(format!(
                    "unknown completion status {other:?}"
                )));
            }
        };
        Ok(Self {
            untagged,
            status,
            text: text.to_string(),
        })
    }

    fn ensure_ok(&self, command: &str) -> Result<(), TransportError> {
        if self.status == Status::Ok {
            Ok(())
        } else {
            Err(TransportError::CommandFailed {
                command: command.to_string(),
                reason: self.text.clone(),
            })
        }
    }
}

/// Byte count announced by a trailing `{n}` (or `{n+}`), if any.
fn literal_len(line: &str) -> Option<usize> {
    let inner = line.strip_suffix('}')?;
    let open = inner.rfind('{')?;
    let digits = inner[open + 1..].trim_end_matches('+');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Tagged command/response framing over any byte stream.
struct ImapConnection<S: Read + Write> {
    stream: BufReader<S>,
    tag_counter: u32,
}

impl<S: Read + Write> ImapConnection<S> {
    fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            tag_counter: 0,
        }
    }

    fn read_raw_line(&mut self) -> Result<String, TransportError> {
        let mut buf = Vec::new();
        if self.stream.read_until(b'\n', &mut buf)? == 0 {
            return Err(TransportError::Protocol("connection closed by server".into()));
        }
        let text = String::from_utf8_lossy(&buf);
        Ok(text.trim_end_matches(['\r', '\n']).to_string())
    }

    fn read_line(&mut self) -> Result<ResponseLine, TransportError> {
        let mut line = ResponseLine::default();
        loop {
            let raw = self.read_raw_line()?;
            line.text.push_str(&raw);
            let Some(len) = literal_len(&raw) else {
                return Ok(line);
            };
            if len > MAX_LITERAL_BYTES {
                return Err(TransportError::Protocol(format!(
                    "literal of {len} bytes exceeds limit"
                )));
            }
            let mut literal = vec![0u8; len];
            self.stream.read_exact(&mut literal)?;
            line.literals.push(literal);
        }
    }

    fn execute(&mut self, args: &[Arg]) -> Result<Response, TransportError> {
        self.tag_counter += 1;
        let tag = format!("A{}", self.tag_counter);
        let tag_prefix = format!("{tag} ");
        let mut untagged = Vec::new();

        self.stream.get_mut().write_all(tag.as_bytes())?;
        for arg in args {
            self.stream.get_mut().write_all(b" ")?;
            match arg {
                Arg::Atom(text) => self.stream.get_mut().write_all(text.as_bytes())?,
                Arg::Literal(bytes) => {
                    let writer = self.stream.get_mut();
                    write!(writer, "{{{}}}\r\n", bytes.len())?;
                    writer.flush()?;
                    loop {
                        let line = self.read_line()?;
                        if line.text.starts_with('+') {
                            break;
                        }
                        if let Some(rest) = line.text.strip_prefix(&tag_prefix) {
                            // Server refused the literal.
                            return Response::completed(untagged, rest);
                        }
                        untagged.push(line);
                    }
                    self.stream.get_mut().write_all(bytes)?;
                }
            }
        }
        let writer = self.stream.get_mut();
        writer.write_all(b"\r\n")?;
        writer.flush()?;

        loop {
            let line = self.read_line()?;
            if let Some(rest) = line.text.strip_prefix(&tag_prefix) {
                return Response::completed(untagged, rest);
            }
            untagged.push(line);
        }
    }
}

// ── Session ─────────────────────────────────────────────────────────

/// An authenticated IMAP session with INBOX selected read-only.
///
/// Dropping the session sends LOGOUT (best effort) before the socket closes.
pub struct ImapSession<S: Read + Write> {
    conn: ImapConnection<S>,
    open: bool,
}

impl<S: Read + Write> ImapSession<S> {
    /// Read the greeting, LOGIN, then EXAMINE INBOX.
    pub fn open(stream: S, credential: &MailboxCredential) -> Result<Self, TransportError> {
        let mut conn = ImapConnection::new(stream);

        let greeting = conn.read_line()?;
        if !(greeting.text.starts_with("* OK") || greeting.text.starts_with("* PREAUTH")) {
            return Err(TransportError::Protocol(format!(
                "unexpected greeting: {}",
                greeting.text
            )));
        }

        // From here on, every exit path logs out via Drop.
        let mut session = Self { conn, open: true };

        let login = session.conn.execute(&[
            atom("LOGIN"),
            astring(credential.username()),
            astring(credential.secret().expose_secret()),
        ])?;
        if login.status != Status::Ok {
            return Err(TransportError::AuthRejected {
                username: credential.username().to_string(),
                reason: login.text,
            });
        }

        session
            .conn
            .execute(&[atom("EXAMINE"), atom("INBOX")])?
            .ensure_ok("EXAMINE")?;

        Ok(session)
    }

    fn logout(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        match self.conn.execute(&[atom("LOGOUT")]) {
            Ok(_) => tracing::debug!("IMAP session logged out"),
            Err(e) => tracing::debug!(error = %e, "IMAP LOGOUT failed; dropping connection"),
        }
    }
}

impl<S: Read + Write> Drop for ImapSession<S> {
    fn drop(&mut self) {
        self.logout();
    }
}

impl<S: Read + Write + Send> MailSession for ImapSession<S> {
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<MessageId>, TransportError> {
        tracing::info!(criteria = %criteria, "Searching mailbox");
        let response = self.conn.execute(&search_args(criteria))?;
        response.ensure_ok("UID SEARCH")?;
        let ids = parse_search_ids(&response.untagged);
        tracing::info!(matches = ids.len(), "Mailbox search finished");
        Ok(ids)
    }

    fn fetch(&mut self, id: &MessageId) -> Result<Vec<u8>, TransportError> {
        if id.as_str().is_empty() || !id.as_str().bytes().all(|b| b.is_ascii_digit()) {
            return Err(TransportError::Protocol(format!("invalid UID {id:?}")));
        }
        let response = self.conn.execute(&[
            atom("UID"),
            atom("FETCH"),
            Arg::Atom(id.to_string()),
            atom("BODY.PEEK[]"),
        ])?;
        response.ensure_ok("UID FETCH")?;

        response
            .untagged
            .into_iter()
            .filter(|line| line.text.contains(" FETCH "))
            .find_map(|line| line.literals.into_iter().next())
            .ok_or_else(|| TransportError::MissingBody { id: id.to_string() })
    }

    fn close(mut self: Box<Self>) {
        self.logout();
    }
}

/// `UID SEARCH [CHARSET UTF-8] [SUBJECT s] [SINCE d] [BEFORE d]`.
fn search_args(criteria: &SearchCriteria) -> Vec<Arg> {
    let mut args = vec![atom("UID"), atom("SEARCH")];
    if let Some(subject) = &criteria.subject {
        let subject_arg = astring(subject);
        if matches!(subject_arg, Arg::Literal(_)) {
            args.push(atom("CHARSET"));
            args.push(atom("UTF-8"));
        }
        args.push(atom("SUBJECT"));
        args.push(subject_arg);
    }
    args.extend(criteria.date_keys().into_iter().map(Arg::Atom));
    args
}

fn parse_search_ids(untagged: &[ResponseLine]) -> Vec<MessageId> {
    untagged
        .iter()
        .filter_map(|line| line.text.strip_prefix("* SEARCH"))
        .flat_map(str::split_whitespace)
        .map(MessageId::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;

    use chrono::NaiveDate;

    use super::*;

    /// Replays canned server output and records what the client wrote.
    struct ScriptedStream {
        input: Cursor<Vec<u8>>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn scripted(server: &[u8]) -> (ScriptedStream, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let stream = ScriptedStream {
            input: Cursor::new(server.to_vec()),
            written: Arc::clone(&written),
        };
        (stream, written)
    }

    fn written_text(written: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&written.lock().unwrap()).to_string()
    }

    fn credential() -> MailboxCredential {
        MailboxCredential::new("ops@example.com", "app-password")
    }

    const LOGIN_OK: &str = "* OK Gimap ready\r\n\
        A1 OK ops@example.com authenticated (Success)\r\n\
        * 3 EXISTS\r\n\
        A2 OK [READ-ONLY] INBOX selected. (Success)\r\n";

    #[test]
    fn literal_len_detection() {
        assert_eq!(literal_len("* 1 FETCH (UID 7 BODY[] {342}"), Some(342));
        assert_eq!(literal_len("A1 LOGIN {5+}"), Some(5));
        assert_eq!(literal_len("* OK no literal here"), None);
        assert_eq!(literal_len("* OK {}"), None);
        assert_eq!(literal_len("* OK {abc}"), None);
    }

    #[test]
    fn search_and_fetch_round() {
        let raw = "Subject: Invoice 42\r\n\r\nPlease pay.\r\n";
        let server = format!(
            "{LOGIN_OK}* SEARCH 11 12\r\n\
             A3 OK SEARCH completed (Success)\r\n\
             * 1 FETCH (UID 11 BODY[] {{{}}}\r\n{raw})\r\n\
             A4 OK Success\r\n\
             * BYE LOGOUT Requested\r\n\
             A5 OK 73 good day (Success)\r\n",
            raw.len()
        );
        let (stream, written) = scripted(server.as_bytes());

        let mut session = ImapSession::open(stream, &credential()).unwrap();
        let criteria = SearchCriteria {
            subject: Some("Invoice".into()),
            since: None,
            before: None,
        };
        let ids = session.search(&criteria).unwrap();
        assert_eq!(ids, vec![MessageId::new("11"), MessageId::new("12")]);

        let body = session.fetch(&ids[0]).unwrap();
        assert_eq!(body, raw.as_bytes());

        Box::new(session).close();

        let sent = written_text(&written);
        assert!(sent.contains("A1 LOGIN \"ops@example.com\" \"app-password\"\r\n"));
        assert!(sent.contains("A2 EXAMINE INBOX\r\n"));
        assert!(sent.contains("A3 UID SEARCH SUBJECT \"Invoice\"\r\n"));
        assert!(sent.contains("A4 UID FETCH 11 BODY.PEEK[]\r\n"));
        assert!(sent.ends_with("A5 LOGOUT\r\n"));
    }

    #[test]
    fn rejected_login_still_logs_out() {
        let server = "* OK Gimap ready\r\n\
            A1 NO [AUTHENTICATIONFAILED] Invalid credentials (Failure)\r\n\
            * BYE\r\n\
            A2 OK bye\r\n";
        let (stream, written) = scripted(server.as_bytes());

        let err = ImapSession::open(stream, &credential()).err().unwrap();
        match err {
            TransportError::AuthRejected { username, reason } => {
                assert_eq!(username, "ops@example.com");
                assert!(reason.contains("Invalid credentials"));
            }
            other => panic!("expected AuthRejected, got {other:?}"),
        }
        assert!(written_text(&written).ends_with("A2 LOGOUT\r\n"));
    }

    #[test]
    fn bye_greeting_is_a_protocol_error() {
        let (stream, written) = scripted(b"* BYE too many connections\r\n");
        let err = ImapSession::open(stream, &credential()).err().unwrap();
        assert!(matches!(err, TransportError::Protocol(_)));
        assert!(written_text(&written).is_empty());
    }

    #[test]
    fn non_ascii_subject_uses_utf8_literal() {
        let subject = "Facturación";
        let server = format!(
            "{LOGIN_OK}+ go ahead\r\n\
             * SEARCH\r\n\
             A3 OK SEARCH completed\r\n"
        );
        let (stream, written) = scripted(server.as_bytes());

        let mut session = ImapSession::open(stream, &credential()).unwrap();
        let criteria = SearchCriteria {
            subject: Some(subject.into()),
            since: NaiveDate::from_ymd_opt(2024, 1, 1),
            before: None,
        };
        let ids = session.search(&criteria).unwrap();
        assert!(ids.is_empty());

        let sent = written_text(&written);
        let expected = format!(
            "A3 UID SEARCH CHARSET UTF-8 SUBJECT {{{}}}\r\n{subject} SINCE 01-Jan-2024\r\n",
            subject.len()
        );
        assert!(sent.contains(&expected), "sent: {sent}");
    }

    #[test]
    fn failed_search_is_reported() {
        let server = format!("{LOGIN_OK}A3 BAD Could not parse command\r\n");
        let (stream, _written) = scripted(server.as_bytes());

        let mut session = ImapSession::open(stream, &credential()).unwrap();
        let criteria = SearchCriteria {
            subject: Some("x".into()),
            since: None,
            before: None,
        };
        let err = session.search(&criteria).unwrap_err();
        assert!(matches!(err, TransportError::CommandFailed { ref command, .. } if command == "UID SEARCH"));
    }

    #[test]
    fn fetch_rejects_non_numeric_uid() {
        let (stream, _written) = scripted(LOGIN_OK.as_bytes());
        let mut session = ImapSession::open(stream, &credential()).unwrap();
        let err = session.fetch(&MessageId::new("1 FLAGS")).unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn fetch_without_literal_is_missing_body() {
        let server = format!("{LOGIN_OK}* 1 FETCH (UID 9 FLAGS (\\Seen))\r\nA3 OK done\r\n");
        let (stream, _written) = scripted(server.as_bytes());
        let mut session = ImapSession::open(stream, &credential()).unwrap();
        let err = session.fetch(&MessageId::new("9")).unwrap_err();
        assert!(matches!(err, TransportError::MissingBody { .. }));
    }

    #[test]
    fn search_args_with_dates_only() {
        let criteria = SearchCriteria {
            subject: None,
            since: NaiveDate::from_ymd_opt(2024, 2, 1),
            before: NaiveDate::from_ymd_opt(2024, 2, 10),
        };
        assert_eq!(
            search_args(&criteria),
            vec![
                atom("UID"),
                atom("SEARCH"),
                atom("SINCE 01-Feb-2024"),
                atom("BEFORE 10-Feb-2024"),
            ]
        );
    }
}
