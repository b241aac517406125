//! Mail session collaborator.
//!
//! The pipeline only needs two operations from a mailbox: search for
//! messages from a sender, and fetch one message as raw RFC 822 bytes.
//! `ImapSession` is the production implementation; tests use in-memory fakes.

pub mod imap;
pub mod message;

pub use imap::ImapSession;
pub use message::RawMessage;

use crate::config::SenderKind;
use crate::error::MailError;

/// Opaque handle to a message inside a mailbox (an IMAP sequence number).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub String);

impl std::fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to search the mailbox for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriterion {
    /// Messages whose `From` header contains this text.
    From(String),
}

impl SearchCriterion {
    /// Search for notifications sent by the given source.
    pub fn for_sender(sender: SenderKind) -> Self {
        Self::From(sender.from_name().to_string())
    }

    /// Render as IMAP `SEARCH` arguments.
    pub fn to_imap(&self) -> String {
        match self {
            Self::From(name) => format!("FROM {}", quote(name)),
        }
    }
}

/// Quote a string for use as an IMAP quoted-string argument.
pub(crate) fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Blocking access to a mailbox.
///
/// Errors are fatal to the run. A fetch that returns `Ok(None)` means the
/// server had no content for the handle; callers skip it.
pub trait MailSession {
    fn search(&mut self, criterion: &SearchCriterion) -> Result<Vec<MessageHandle>, MailError>;

    fn fetch(&mut self, handle: &MessageHandle) -> Result<Option<Vec<u8>>, MailError>;
}
