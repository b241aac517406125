//! Message corroborator.
//!
//! A GitHub "new issue" notification carries the issue number twice: as the
//! last path segment of the issue link in the body, and as an
//! `(Issue #N)` tag in the subject. A number is only trusted when both agree.
//! Comment permalinks (`.../issues/42#issuecomment-99`) never match because
//! the link has to end the fragment.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::{RepoSlug, SenderKind};
use crate::pipeline::types::{CleanedMessage, CorroboratedIdentifier};

static SUBJECT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(Issue #\d+\)").expect("subject tag pattern is valid"));

/// Outcome of checking one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Body and subject agree on exactly one issue number.
    Confirmed(u64),
    /// No fragment looks like an issue-creation link for the repository.
    NoCreationLink,
    /// Body has creation links but the subject carries no `(Issue #N)` tag.
    MissingSubjectTag,
    /// None of the body candidates appear in the subject tag.
    SubjectMismatch { candidates: Vec<u64>, tag: String },
    /// More than one distinct candidate appears in the subject tag.
    Ambiguous(Vec<u64>),
    /// The sender has no corroboration rule.
    Unsupported(SenderKind),
}

impl Verdict {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "confirmed",
            Self::NoCreationLink => "no_creation_link",
            Self::MissingSubjectTag => "missing_subject_tag",
            Self::SubjectMismatch { .. } => "subject_mismatch",
            Self::Ambiguous(_) => "ambiguous",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

/// Corroboration rule for one repository and sender, with its link pattern
/// compiled once.
#[derive(Debug, Clone)]
pub struct Corroborator {
    sender: SenderKind,
    creation_link: Regex,
}

impl Corroborator {
    pub fn new(repo: &RepoSlug, sender: SenderKind) -> Self {
        let pattern = format!(
            r"https://github\.com/{}/{}/issues/(\d+)$",
            regex::escape(repo.owner()),
            regex::escape(repo.name()),
        );
        Self {
            sender,
            creation_link: Regex::new(&pattern).expect("escaped repository pattern is valid"),
        }
    }

    /// Candidate numbers from body fragments, in fragment order, duplicates kept.
    ///
    /// Returned as decimal text so the subject comparison sees the digits
    /// exactly as they appeared in the link.
    pub fn candidates<'a>(&self, fragments: &'a [String]) -> Vec<&'a str> {
        fragments
            .iter()
            .filter_map(|f| self.creation_link.captures(f))
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|digits| digits.parse::<u64>().is_ok())
            .collect()
    }

    /// Decide whether `cleaned` documents a newly created issue.
    pub fn assess(&self, cleaned: &CleanedMessage) -> Verdict {
        match self.sender {
            SenderKind::Github => self.assess_github(cleaned),
            SenderKind::Jira => Verdict::Unsupported(SenderKind::Jira),
        }
    }

    fn assess_github(&self, cleaned: &CleanedMessage) -> Verdict {
        let candidates = self.candidates(&cleaned.body_fragments);
        if candidates.is_empty() {
            return Verdict::NoCreationLink;
        }

        let Some(tag) = SUBJECT_TAG.find(&cleaned.subject) else {
            return Verdict::MissingSubjectTag;
        };
        let tag = tag.as_str();

        let confirmed: BTreeSet<u64> = candidates
            .iter()
            .filter(|c| tag.contains(**c))
            .filter_map(|c| c.parse().ok())
            .collect();

        let mut numbers = confirmed.into_iter();
        match (numbers.next(), numbers.next()) {
            (None, _) => Verdict::SubjectMismatch {
                candidates: candidates.iter().filter_map(|c| c.parse().ok()).collect(),
                tag: tag.to_string(),
            },
            (Some(number), None) => Verdict::Confirmed(number),
            (Some(first), Some(second)) => {
                Verdict::Ambiguous([first, second].into_iter().chain(numbers).collect())
            }
        }
    }

    /// The confirmed identifier for `cleaned`, if any.
    ///
    /// Ambiguous messages are logged and dropped rather than failing the run.
    pub fn corroborate(&self, cleaned: &CleanedMessage) -> Option<CorroboratedIdentifier> {
        let verdict = self.assess(cleaned);
        match verdict {
            Verdict::Confirmed(number) => {
                debug!(number, subject = %cleaned.subject, "Corroborated issue");
                Some(CorroboratedIdentifier {
                    number,
                    subject: cleaned.subject.clone(),
                })
            }
            Verdict::Ambiguous(ref numbers) => {
                warn!(
                    subject = %cleaned.subject,
                    candidates = ?numbers,
                    "Ambiguous message: several issue numbers match the subject tag, skipping"
                );
                None
            }
            other => {
                debug!(
                    subject = %cleaned.subject,
                    verdict = other.label(),
                    "Message not corroborated"
                );
                None
            }
        }
    }
}

/// One-off corroboration without keeping a [`Corroborator`] around.
pub fn corroborate(
    cleaned: &CleanedMessage,
    repo: &RepoSlug,
    sender: SenderKind,
) -> Option<u64> {
    Corroborator::new(repo, sender)
        .corroborate(cleaned)
        .map(|id| id.number)
}
