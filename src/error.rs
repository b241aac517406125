//! Error types for inbox-miner.

/// Top-level error type for a mining run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mail retrieval failed: {0}")]
    Mail(#[from] MailError),

    #[error("Mining error: {0}")]
    Mining(#[from] MiningError),

    #[error("Handoff error: {0}")]
    Handoff(#[from] HandoffError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mail session errors. Every variant is fatal to the run; nothing retries.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Could not connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Invalid server name: {0}")]
    ServerName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication failed for {user}")]
    Auth { user: String },

    #[error("IMAP command {command} rejected: {response}")]
    Command { command: String, response: String },

    #[error("IMAP protocol error: {0}")]
    Protocol(String),

    #[error("Mail task failed: {0}")]
    Task(String),
}

/// Errors raised while turning messages into an identifier range.
#[derive(Debug, thiserror::Error)]
pub enum MiningError {
    #[error("No issue identifiers found; nothing to mine")]
    NoIdentifiers,
}

/// Errors raised while handing a request to the downstream extractor.
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("Failed to write extractor input at {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Extractor settings must be a JSON object, got {0}")]
    InvalidSettings(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for inbox-miner.
pub type Result<T> = std::result::Result<T, Error>;
