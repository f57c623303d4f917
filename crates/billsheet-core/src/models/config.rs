//! Configuration structures for a billsheet run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration, built once at process start and passed by reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BillsheetConfig {
    /// Document processed when no path is given on the command line.
    pub document: PathBuf,

    /// Template repository configuration.
    pub templates: TemplateConfig,

    /// Text recognition and field mapping configuration.
    pub extraction: ExtractionConfig,

    /// Spreadsheet publishing configuration.
    pub sheets: SheetsConfig,
}

/// Where template definition files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Root directory scanned recursively for template files.
    pub dir: PathBuf,

    /// File extensions recognized as template definitions.
    pub extensions: Vec<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./Templates"),
            extensions: vec!["yml".to_string(), "yaml".to_string()],
        }
    }
}

/// How document text is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSourceKind {
    /// Pick a source from the document type.
    Auto,
    /// Text embedded in the PDF.
    Embedded,
    /// Poppler `pdftotext -layout`.
    Pdftotext,
    /// OCR over the page images.
    Ocr,
    /// Plain text file.
    Plain,
}

impl Default for TextSourceKind {
    fn default() -> Self {
        Self::Auto
    }
}

/// Text recognition and field mapping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Text source selection.
    pub text_source: TextSourceKind,

    /// Minimum embedded text length before falling back to OCR.
    pub min_text_length: usize,

    /// Directory holding `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    pub ocr_model_dir: Option<PathBuf>,

    /// Raw field names read by the normalizer.
    pub fields: FieldMap,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            text_source: TextSourceKind::Auto,
            min_text_length: 50,
            ocr_model_dir: None,
            fields: FieldMap::default(),
        }
    }
}

/// Names of the raw extraction fields feeding each record column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub date: String,
    pub pre_tax_amount: String,
    pub vat_rate: String,
    pub vat_amount: String,
    pub total_amount: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            date: "date".to_string(),
            pre_tax_amount: "ht".to_string(),
            vat_rate: "tva_rate".to_string(),
            vat_amount: "tva_amount".to_string(),
            total_amount: "amount".to_string(),
        }
    }
}

/// Google Sheets publishing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Target spreadsheet identifier.
    pub spreadsheet_id: String,

    /// A1 range the row is appended after.
    pub range: String,

    /// `valueInputOption` of the append call.
    pub value_input_option: String,

    /// `insertDataOption` of the append call.
    pub insert_data_option: String,

    /// OAuth client secret file (Google "installed app" layout).
    pub credentials_path: PathBuf,

    /// Persisted access/refresh token.
    pub token_path: PathBuf,

    /// OAuth scopes requested during consent.
    pub scopes: Vec<String>,

    /// Sheets API base URL.
    pub api_base: String,

    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            range: "Sheet1!A1:E1".to_string(),
            value_input_option: "USER_ENTERED".to_string(),
            insert_data_option: "INSERT_ROWS".to_string(),
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            scopes: vec!["https://www.googleapis.com/auth/spreadsheets".to_string()],
            api_base: "https://sheets.googleapis.com/v4/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl BillsheetConfig {
    /// Default document location.
    pub const DEFAULT_DOCUMENT: &'static str = "Bills/Invoice.pdf";

    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, std::io::Error> {
        let mut config: Self = serde_json::from_str(content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        config.fill_defaults();
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Built-in configuration.
    pub fn defaults() -> Self {
        let mut config = Self::default();
        config.fill_defaults();
        config
    }

    fn fill_defaults(&mut self) {
        if self.document.as_os_str().is_empty() {
            self.document = PathBuf::from(Self::DEFAULT_DOCUMENT);
        }
    }
}
