//! Message extractor: raw RFC 822 bytes to `NormalizedMessage`.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use mail_parser::{HeaderName, MessageParser, MimeHeaders, PartType};

use crate::error::ParseError;
use crate::mail::types::{MessageId, NormalizedMessage};

/// Signature and legal-footer markers. The body is cut at the earliest one.
pub const BOILERPLATE_MARKERS: &[&str] = &[
    "LA INFORMACION AQUI CONTENIDA ES CONFIDENCIAL",
    "THE INFORMATION CONTAINED IN THIS E-MAIL IS PRIVILEGED",
    "-- \r\n\r\n[image: photo]",
    "Cordialmente,",
    "Saludos,",
    "Atentamente,",
    "Regards,",
    "Best regards,",
    "www.newsan.com.ar",
    "--------------------------------------------------------------------",
    "____________________________________________________________________",
];

/// Parse and normalize one message.
///
/// Returns `None` only when the bytes are not a message at all. Header
/// decoding falls back to lossy UTF-8; a bad Date header leaves `sent_at`
/// empty; a message without a usable text part gets an empty body.
pub fn extract(raw: &[u8], id: &MessageId) -> Option<NormalizedMessage> {
    let Some(parsed) = MessageParser::default().parse(raw) else {
        tracing::warn!(uid = %id, "Could not parse message; skipping");
        return None;
    };

    let sent_at = match parse_sent_at(&parsed) {
        Ok(ts) => Some(ts),
        Err(e) => {
            tracing::debug!(uid = %id, error = %e, "Keeping message without a timestamp");
            None
        }
    };

    let body = plain_text_body(&parsed).unwrap_or_default();

    Some(NormalizedMessage {
        id: id.clone(),
        sent_at,
        date_header: parsed
            .header_raw(HeaderName::Date)
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(str::to_string),
        sender: render_sender(&parsed),
        subject: parsed.subject().unwrap_or_default().to_string(),
        body: strip_boilerplate(&body).trim().to_string(),
    })
}

/// Cut `body` at the earliest boilerplate marker. No marker → unchanged.
pub fn strip_boilerplate(body: &str) -> &str {
    let cut = BOILERPLATE_MARKERS
        .iter()
        .filter_map(|marker| body.find(marker))
        .min()
        .unwrap_or(body.len());
    &body[..cut]
}

/// First `text/plain` (or untyped) part that is not an attachment.
fn plain_text_body(parsed: &mail_parser::Message<'_>) -> Option<String> {
    parsed.parts.iter().find_map(|part| {
        let PartType::Text(text) = &part.body else {
            return None;
        };
        let is_plain = MimeHeaders::content_type(part).is_none_or(|ct| {
            ct.ctype().eq_ignore_ascii_case("text")
                && ct.subtype().is_none_or(|sub| sub.eq_ignore_ascii_case("plain"))
        });
        let is_attachment = MimeHeaders::content_disposition(part)
            .is_some_and(|cd| cd.ctype().eq_ignore_ascii_case("attachment"));
        (is_plain && !is_attachment).then(|| text.to_string())
    })
}

fn parse_sent_at(parsed: &mail_parser::Message<'_>) -> Result<DateTime<FixedOffset>, ParseError> {
    let d = parsed.date().ok_or(ParseError::MissingDate)?;
    let invalid = || ParseError::InvalidDate(format!("{d:?}"));

    let offset_secs = (i32::from(d.tz_hour) * 3600 + i32::from(d.tz_minute) * 60)
        * if d.tz_before_gmt { -1 } else { 1 };
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(invalid)?;

    let naive = NaiveDate::from_ymd_opt(i32::from(d.year), u32::from(d.month), u32::from(d.day))
        .and_then(|date| {
            date.and_hms_opt(u32::from(d.hour), u32::from(d.minute), u32::from(d.second))
        })
        .ok_or_else(invalid)?;

    offset.from_local_datetime(&naive).single().ok_or_else(invalid)
}

/// `Name <address>` when a display name exists, else whichever part is present.
fn render_sender(parsed: &mail_parser::Message<'_>) -> String {
    let Some(addr) = parsed.from().and_then(|from| from.first()) else {
        return String::new();
    };
    match (addr.name(), addr.address()) {
        (Some(name), Some(address)) => format!("{name} <{address}>"),
        (Some(name), None) => name.to_string(),
        (None, Some(address)) => address.to_string(),
        (None, None) => String::new(),
    }
}
