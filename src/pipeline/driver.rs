//! Pipeline driver.
//!
//! Flow for one run:
//! 1. Retrieve candidate messages from the mail session (fatal on error)
//! 2. Normalize each body into printable fragments
//! 3. Corroborate each message against the repository
//! 4. Aggregate the confirmed identifiers into a range
//!
//! The driver only computes the result. Handing it to the extractor is the
//! caller's job, done once after the range is known.

use tracing::{debug, info, warn};

use crate::config::{RepoSlug, SenderKind};
use crate::error::{MailError, MiningError, Result};
use crate::mail::{MailSession, RawMessage, SearchCriterion};
use crate::pipeline::aggregate::{MinedIssues, aggregate};
use crate::pipeline::corroborate::Corroborator;
use crate::pipeline::types::{CleanedMessage, CorroboratedIdentifier, IdentifierRange};

/// Normalize and corroborate every message, keeping confirmed identifiers.
pub fn corroborate_all(
    messages: impl IntoIterator<Item = RawMessage>,
    repo: &RepoSlug,
    sender: SenderKind,
) -> Vec<CorroboratedIdentifier> {
    let corroborator = Corroborator::new(repo, sender);
    let mut examined = 0usize;

    let identifiers: Vec<_> = messages
        .into_iter()
        .inspect(|_| examined += 1)
        .map(CleanedMessage::from_raw)
        .filter_map(|cleaned| corroborator.corroborate(&cleaned))
        .collect();

    info!(
        repo = %repo,
        sender = sender.label(),
        examined,
        corroborated = identifiers.len(),
        "Corroboration complete"
    );
    identifiers
}

/// Inclusive range of issues announced in `messages`.
pub fn run(
    messages: impl IntoIterator<Item = RawMessage>,
    repo: &RepoSlug,
    sender: SenderKind,
) -> std::result::Result<IdentifierRange, MiningError> {
    aggregate(&corroborate_all(messages, repo, sender))
}

/// Like [`run`], but keeps the distinct issue set next to the range.
pub fn mine(
    messages: impl IntoIterator<Item = RawMessage>,
    repo: &RepoSlug,
    sender: SenderKind,
) -> std::result::Result<MinedIssues, MiningError> {
    let mined = MinedIssues::from_identifiers(&corroborate_all(messages, repo, sender))?;

    if !mined.is_contiguous() {
        warn!(
            range = %mined.range(),
            seen = mined.issues().len(),
            unseen = mined.unseen_in_range(),
            "Range includes issues no notification announced"
        );
    }
    Ok(mined)
}

/// Search the mailbox for the sender's notifications and fetch each one.
///
/// Fetches that come back empty and bytes that do not parse as a message are
/// skipped. Any session error aborts the retrieval.
pub fn retrieve(
    session: &mut dyn MailSession,
    sender: SenderKind,
) -> std::result::Result<Vec<RawMessage>, MailError> {
    let criterion = SearchCriterion::for_sender(sender);
    let handles = session.search(&criterion)?;
    info!(
        criterion = %criterion.to_imap(),
        found = handles.len(),
        "Mailbox search complete"
    );

    let mut messages = Vec::with_capacity(handles.len());
    for handle in &handles {
        let Some(bytes) = session.fetch(handle)? else {
            debug!(%handle, "Fetch returned no content, skipping");
            continue;
        };
        match RawMessage::parse(&bytes) {
            Some(message) => messages.push(message),
            None => warn!(%handle, bytes = bytes.len(), "Could not parse fetched message"),
        }
    }
    Ok(messages)
}

/// Retrieve from `session`, then mine. Nothing is normalized if retrieval fails.
///
/// Retrieval failures surface as [`Error::Mail`](crate::error::Error::Mail), an
/// empty result as [`Error::Mining`](crate::error::Error::Mining), so callers
/// can tell "could not look" from "nothing to do".
pub fn mine_session(
    session: &mut dyn MailSession,
    repo: &RepoSlug,
    sender: SenderKind,
) -> Result<MinedIssues> {
    let messages = retrieve(session, sender)?;
    Ok(mine(messages, repo, sender)?)
}
