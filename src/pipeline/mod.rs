//! Issue mining pipeline.
//!
//! Messages flow one way through:
//! 1. `normalize` splits each body into printable fragments
//! 2. `corroborate` confirms an issue number from body link + subject tag
//! 3. `aggregate` reduces confirmed numbers to an inclusive range
//! 4. `driver` sequences the steps for one run
//!
//! Every stage owns its input; there is no shared mutable state.

pub mod aggregate;
pub mod corroborate;
pub mod driver;
pub mod normalize;
pub mod types;

pub use aggregate::{MinedIssues, aggregate};
pub use corroborate::{Corroborator, Verdict, corroborate};
pub use driver::{mine, mine_session, retrieve, run};
pub use normalize::normalize;
pub use types::{CleanedMessage, CorroboratedIdentifier, IdentifierRange};
