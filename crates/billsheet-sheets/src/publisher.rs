//! [`RowPublisher`] backed by Google Sheets.

use std::time::Duration;

use billsheet_core::models::config::SheetsConfig;
use billsheet_core::{RowPublisher, SheetRow};
use tracing::info;

use crate::client::SheetsClient;
use crate::oauth::Authenticator;
use crate::{Result, SheetsError};

/// Authenticates, then appends each row to the configured range.
pub struct SheetsPublisher {
    auth: Authenticator,
    client: SheetsClient,
}

impl SheetsPublisher {
    pub fn from_config(config: &SheetsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Self::with_http_client(http, config)
    }

    /// Build the publisher on an existing HTTP client.
    pub fn with_http_client(http: reqwest::Client, config: &SheetsConfig) -> Result<Self> {
        Ok(Self {
            auth: Authenticator::new(http.clone(), config),
            client: SheetsClient::new(http, config)?,
        })
    }
}

impl RowPublisher for SheetsPublisher {
    type Error = SheetsError;

    async fn append_row(&self, row: &SheetRow) -> Result<u64> {
        info!("Authenticating with Google Sheets...");
        let token = self.auth.access_token().await?;
        self.client.append(&token, row).await
    }
}
