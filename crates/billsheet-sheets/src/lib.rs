//! Google Sheets publisher for billsheet.
//!
//! This crate provides:
//! - OAuth2 installed-app authorization with a persisted, refreshed token
//! - The `spreadsheets.values.append` call used to add one invoice row
//! - [`SheetsPublisher`], the `RowPublisher` used by the CLI

mod client;
mod credentials;
mod error;
mod oauth;
mod publisher;
mod token;

pub use client::{cell_value, SheetsClient};
pub use credentials::ClientSecret;
pub use error::SheetsError;
pub use oauth::{pkce_challenge, Authenticator};
pub use publisher::SheetsPublisher;
pub use token::StoredToken;

/// Result type for Sheets operations.
pub type Result<T> = std::result::Result<T, SheetsError>;
