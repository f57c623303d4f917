//! The `spreadsheets.values.append` call.

use billsheet_core::models::config::SheetsConfig;
use billsheet_core::{Cell, SheetRow};
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::{Result, SheetsError};

/// Appends rows to one range of one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    api_base: Url,
    spreadsheet_id: String,
    range: String,
    value_input_option: String,
    insert_data_option: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<UpdateValuesResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_range: Option<String>,
    #[serde(default)]
    updated_cells: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, config: &SheetsConfig) -> Result<Self> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err(SheetsError::Config(
                "sheets.spreadsheet_id is not set".to_string(),
            ));
        }
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| SheetsError::Config(format!("invalid sheets.api_base: {}", e)))?;

        Ok(Self {
            http,
            api_base,
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            value_input_option: config.value_input_option.clone(),
            insert_data_option: config.insert_data_option.clone(),
        })
    }

    /// `{api_base}spreadsheets/{id}/values/{range}:append?...`
    pub fn append_url(&self) -> Result<Url> {
        let target = format!("{}:append", self.range);
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::Config("sheets.api_base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend([
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                target.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", &self.value_input_option)
            .append_pair("insertDataOption", &self.insert_data_option);
        Ok(url)
    }

    /// JSON body of the append call for one row.
    pub fn append_body(&self, row: &SheetRow) -> Value {
        let values: Vec<Value> = row.cells().iter().map(cell_value).collect();
        json!({
            "range": self.range,
            "majorDimension": "ROWS",
            "values": [values],
        })
    }

    /// Append `row` and return the number of updated cells.
    pub async fn append(&self, access_token: &str, row: &SheetRow) -> Result<u64> {
        let url = self.append_url()?;
        debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&self.append_body(row))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(ApiErrorBody { error }) => match error.status {
                    Some(s) => format!("{} ({})", error.message, s),
                    None => error.message,
                },
                Err(_) => body,
            };
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AppendResponse = response.json().await?;
        let updates = parsed.updates.unwrap_or(UpdateValuesResponse {
            updated_range: None,
            updated_cells: None,
        });
        if let Some(range) = &updates.updated_range {
            debug!("Updated range {}", range);
        }
        Ok(updates.updated_cells.unwrap_or(0))
    }
}

/// JSON value of one cell: strings, numbers, or `null` for an absent value.
pub fn cell_value(cell: &Cell) -> Value {
    match cell {
        Cell::Text(text) => Value::String(text.clone()),
        Cell::Number(n) => n
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number),
        Cell::Empty => Value::Null,
    }
}
