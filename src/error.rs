//! Heirloom error types
//!
//! Access-control denials are NOT errors — they are `Decision::Deny`
//! values returned by the evaluator. This enum covers the exceptional
//! cases only.

use thiserror::Error;

/// Heirloom error type
#[derive(Error, Debug)]
pub enum Error {
    /// Caller is not the resource owner for an owner-only operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Missing memory, share link, or other record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Share link past its expiry
    #[error("Expired: {0}")]
    Expired(String),

    /// Malformed input (ttl out of range, bad policy, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store I/O failure; the only class eligible for caller retry
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Notification dispatch error
    #[error("Notify error: {0}")]
    Notify(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the caller may retry the operation unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Store(_) | Error::Http(_) | Error::Io(_))
    }
}

/// Heirloom result type
pub type Result<T> = std::result::Result<T, Error>;
