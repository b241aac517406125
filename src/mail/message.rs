//! Raw notification messages parsed from RFC 822 bytes.

use chrono::{DateTime, NaiveDate, Utc};
use mail_parser::{MessageParser, MimeHeaders};

/// A message as retrieved from the mailbox, before any cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub date: Option<DateTime<Utc>>,
    pub subject: String,
    pub body: String,
}

impl RawMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            date: None,
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Parse RFC 822 bytes. Returns `None` when the bytes are not a message.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let parsed = MessageParser::default().parse(bytes)?;

        Some(Self {
            date: parsed.date().and_then(to_utc),
            subject: parsed.subject().unwrap_or_default().to_string(),
            body: extract_text(&parsed),
        })
    }
}

fn to_utc(d: &mail_parser::DateTime) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(i32::from(d.year), u32::from(d.month), u32::from(d.day))?
        .and_hms_opt(u32::from(d.hour), u32::from(d.minute), u32::from(d.second))?;

    let offset_secs = i64::from(d.tz_hour) * 3600 + i64::from(d.tz_minute) * 60;
    let offset_secs = if d.tz_before_gmt {
        -offset_secs
    } else {
        offset_secs
    };

    Some(naive.and_utc() - chrono::Duration::seconds(offset_secs))
}

/// Plain-text body, falling back to text attachments.
///
/// `body_text` already converts an HTML-only body to text, one block per line.
fn extract_text(parsed: &mail_parser::Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.into_owned();
    }
    for part in parsed.attachments() {
        if let Some(ct) = MimeHeaders::content_type(part)
            && ct.ctype() == "text"
            && let Ok(text) = std::str::from_utf8(part.contents())
        {
            return text.to_string();
        }
    }
    String::new()
}
