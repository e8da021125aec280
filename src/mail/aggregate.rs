//! Chronological aggregator: orders normalized messages and joins them into
//! one length-capped transcript.

use crate::mail::types::NormalizedMessage;

/// Upper bound on transcript length, in characters.
pub const MAX_TRANSCRIPT_CHARS: usize = 180_000;

/// Literal placed between rendered messages.
pub const MESSAGE_SEPARATOR: &str = "\n\n--- NEXT EMAIL IN SEQUENCE ---\n\n";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Ordered, delimited rendering of a set of messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    text: String,
    message_count: usize,
    truncated: bool,
}

impl Transcript {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Number of messages rendered, including any cut by truncation.
    pub fn message_count(&self) -> usize {
        self.message_count
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

/// Order by send time and render, capped at [`MAX_TRANSCRIPT_CHARS`].
pub fn aggregate(messages: Vec<NormalizedMessage>) -> Transcript {
    aggregate_with_limit(messages, MAX_TRANSCRIPT_CHARS)
}

/// Same as [`aggregate`] with an explicit character cap.
///
/// Undated messages sort first; equal timestamps keep their input order.
pub fn aggregate_with_limit(mut messages: Vec<NormalizedMessage>, max_chars: usize) -> Transcript {
    // `Option` orders `None` before `Some`; `sort_by_key` is stable.
    messages.sort_by_key(|m| m.sent_at);

    let message_count = messages.len();
    let mut text = messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join(MESSAGE_SEPARATOR);

    let truncated = truncate_chars(&mut text, max_chars);
    if truncated {
        tracing::info!(
            messages = message_count,
            limit = max_chars,
            "Transcript exceeds the character limit; truncated"
        );
    }

    Transcript {
        text,
        message_count,
        truncated,
    }
}

/// Hard cut to at most `max_chars` characters. Returns `true` if anything was cut.
pub fn truncate_chars(text: &mut String, max_chars: usize) -> bool {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            text.truncate(cut);
            true
        }
        None => false,
    }
}

fn render_message(message: &NormalizedMessage) -> String {
    let date = match (&message.sent_at, &message.date_header) {
        (Some(ts), _) => ts.format(DATE_FORMAT).to_string(),
        (None, Some(raw)) => raw.clone(),
        (None, None) => "N/A".to_string(),
    };
    format!(
        "DATE: {date}\nFROM: {}\nSUBJECT: {}\nBODY:\n{}",
        message.sender, message.subject, message.body
    )
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset};

    use super::*;
    use crate::mail::types::MessageId;

    fn message(id: &str, sent_at: Option<&str>, body: &str) -> NormalizedMessage {
        NormalizedMessage {
            id: MessageId::new(id),
            sent_at: sent_at.map(|s| DateTime::<FixedOffset>::parse_from_rfc3339(s).unwrap()),
            date_header: None,
            sender: format!("sender-{id}@example.com"),
            subject: format!("subject {id}"),
            body: body.to_string(),
        }
    }

    fn bodies(transcript: &Transcript) -> Vec<String> {
        transcript
            .as_str()
            .split(MESSAGE_SEPARATOR)
            .map(|block| block.rsplit('\n').next().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn orders_by_send_time() {
        let transcript = aggregate(vec![
            message("1", Some("2024-03-05T10:00:00-03:00"), "third"),
            message("2", Some("2024-03-01T10:00:00+00:00"), "first"),
            message("3", Some("2024-03-03T10:00:00+00:00"), "second"),
        ]);
        assert_eq!(bodies(&transcript), ["first", "second", "third"]);
        assert_eq!(transcript.message_count(), 3);
        assert!(!transcript.truncated());
    }

    #[test]
    fn offsets_are_compared_as_instants() {
        // 09:00 -03:00 is 12:00 UTC, later than 11:00 UTC.
        let transcript = aggregate(vec![
            message("1", Some("2024-03-01T09:00:00-03:00"), "later"),
            message("2", Some("2024-03-01T11:00:00+00:00"), "earlier"),
        ]);
        assert_eq!(bodies(&transcript), ["earlier", "later"]);
    }

    #[test]
    fn undated_messages_come_first() {
        let transcript = aggregate(vec![
            message("1", Some("2024-01-01T00:00:00+00:00"), "dated"),
            message("2", None, "undated"),
        ]);
        assert_eq!(bodies(&transcript), ["undated", "dated"]);
        assert!(transcript.as_str().starts_with("DATE: N/A\n"));
    }

    #[test]
    fn unparsed_date_header_is_shown_as_sent() {
        let mut undated = message("1", None, "body");
        undated.date_header = Some("lunes 3 de marzo".into());
        let dated = message("2", Some("2024-01-01T00:00:00+00:00"), "dated");
        let transcript = aggregate(vec![dated, undated]);
        assert!(transcript.as_str().starts_with("DATE: lunes 3 de marzo\n"));
        assert_eq!(bodies(&transcript), ["body", "dated"]);
    }

    #[test]
    fn truncate_chars_reports_cut() {
        let mut text = "añb".to_string();
        assert!(!truncate_chars(&mut text, 3));
        assert!(truncate_chars(&mut text, 2));
        assert_eq!(text, "añ");
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let ts = Some("2024-02-02T08:00:00+00:00");
        let transcript = aggregate(vec![
            message("1", ts, "a"),
            message("2", None, "x"),
            message("3", ts, "b"),
            message("4", None, "y"),
            message("5", ts, "c"),
        ]);
        assert_eq!(bodies(&transcript), ["x", "y", "a", "b", "c"]);
    }

    #[test]
    fn renders_header_block() {
        let transcript = aggregate(vec![message("9", Some("2024-03-05T14:30:00-03:00"), "hello")]);
        assert_eq!(
            transcript.as_str(),
            "DATE: 2024-03-05 14:30:00 -0300\nFROM: sender-9@example.com\nSUBJECT: subject 9\nBODY:\nhello"
        );
    }

    #[test]
    fn caps_length_on_char_boundary() {
        let long_body = "ñ".repeat(500);
        let transcript = aggregate_with_limit(vec![message("1", None, &long_body)], 100);
        assert_eq!(transcript.as_str().chars().count(), 100);
        assert!(transcript.truncated());
    }

    #[test]
    fn exact_limit_is_not_truncated() {
        let full = aggregate(vec![message("1", None, "body")]);
        let len = full.as_str().chars().count();
        let capped = aggregate_with_limit(vec![message("1", None, "body")], len);
        assert_eq!(capped.as_str(), full.as_str());
        assert!(!capped.truncated());
    }

    #[test]
    fn empty_input_gives_empty_transcript() {
        let transcript = aggregate(Vec::new());
        assert!(transcript.is_empty());
        assert_eq!(transcript.message_count(), 0);
    }
}
