//! inbox-miner: find newly created GitHub issues in a mailbox and hand the
//! issue range to the repository extractor.

pub mod config;
pub mod error;
pub mod handoff;
pub mod mail;
pub mod pipeline;
