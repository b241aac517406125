//! Shared types for the mining pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mail::RawMessage;
use crate::pipeline::normalize::normalize;

// ── Cleaned message ─────────────────────────────────────────────────

/// A message whose body has been split into printable fragments.
///
/// Every fragment is non-empty, contains only printable characters, and
/// fragments keep the order they had in the message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedMessage {
    pub date: Option<DateTime<Utc>>,
    pub subject: String,
    pub body_fragments: Vec<String>,
}

impl CleanedMessage {
    pub fn from_raw(raw: RawMessage) -> Self {
        Self {
            body_fragments: normalize(&raw.body),
            date: raw.date,
            subject: raw.subject,
        }
    }
}

// ── Corroborated identifier ─────────────────────────────────────────

/// An issue number confirmed by both the body link and the subject tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorroboratedIdentifier {
    pub number: u64,
    /// Subject of the message it came from, kept for diagnostics.
    pub subject: String,
}

// ── Identifier range ────────────────────────────────────────────────

/// Inclusive `[min, max]` range of issue numbers. Always `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "[u64; 2]", try_from = "[u64; 2]")]
pub struct IdentifierRange {
    min: u64,
    max: u64,
}

impl IdentifierRange {
    /// Returns `None` when `min > max`.
    pub fn new(min: u64, max: u64) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    /// Number of issue numbers covered by the range.
    pub fn span(&self) -> u64 {
        (self.max - self.min).saturating_add(1)
    }
}

impl From<IdentifierRange> for [u64; 2] {
    fn from(range: IdentifierRange) -> Self {
        [range.min, range.max]
    }
}

impl TryFrom<[u64; 2]> for IdentifierRange {
    type Error = String;

    fn try_from([min, max]: [u64; 2]) -> Result<Self, Self::Error> {
        Self::new(min, max).ok_or_else(|| format!("range start {min} is after end {max}"))
    }
}

impl std::fmt::Display for IdentifierRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaned_message_passes_date_and_subject_through() {
        let date = Utc::now();
        let raw = RawMessage::new("(Issue #1)", "line one\nline two").with_date(date);
        let cleaned = CleanedMessage::from_raw(raw);
        assert_eq!(cleaned.subject, "(Issue #1)");
        assert_eq!(cleaned.date, Some(date));
        assert_eq!(cleaned.body_fragments, vec!["line one", "line two"]);
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        assert!(IdentifierRange::new(9, 3).is_none());
        let range = IdentifierRange::new(3, 9).unwrap();
        assert_eq!((range.min(), range.max()), (3, 9));
        assert_eq!(range.span(), 7);
    }

    #[test]
    fn range_serializes_as_pair() {
        let range = IdentifierRange::new(10, 14).unwrap();
        assert_eq!(serde_json::to_value(range).unwrap(), serde_json::json!([10, 14]));

        let back: IdentifierRange = serde_json::from_str("[10, 14]").unwrap();
        assert_eq!(back, range);
        assert!(serde_json::from_str::<IdentifierRange>("[14, 10]").is_err());
    }

    #[test]
    fn degenerate_range_displays_both_bounds() {
        let range = IdentifierRange::new(5, 5).unwrap();
        assert_eq!(range.span(), 1);
        assert_eq!(range.to_string(), "[5, 5]");
    }
}
