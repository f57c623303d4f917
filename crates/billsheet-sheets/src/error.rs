//! Error types for the Sheets publisher.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while authenticating or appending a row.
#[derive(Error, Debug)]
pub enum SheetsError {
    /// The OAuth client secret file is missing or malformed.
    #[error("invalid client credentials {path}: {reason}")]
    Credentials { path: PathBuf, reason: String },

    /// The persisted token could not be read or written.
    #[error("token store {path}: {reason}")]
    TokenStore { path: PathBuf, reason: String },

    /// The browser consent flow failed or was refused.
    #[error("authorization failed: {0}")]
    Consent(String),

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Publisher configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error on the loopback listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
