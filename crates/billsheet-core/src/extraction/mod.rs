//! Document extraction: text recognition plus template matching.

mod pipeline;
pub mod sources;

pub use pipeline::{ExtractionOutcome, ExtractionPipeline};
pub use sources::{text_source_for, AutoTextSource, EmbeddedPdfSource, OcrSource, PdftotextSource, PlainTextSource};

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Turns a document into plain text (embedded text, poppler or OCR).
pub trait TextSource {
    /// Recognize the full text of the document at `path`.
    fn document_text(&self, path: &Path) -> Result<String>;

    /// Name of this source (for diagnostics).
    fn name(&self) -> &str;
}

/// A loosely typed value captured by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
}

impl RawValue {
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
            Self::Date(d) => write!(f, "{}", d),
        }
    }
}

/// Field mapping produced by the matching template for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawExtraction {
    /// Name of the template that matched.
    pub template: String,

    /// Field name to captured value.
    pub fields: BTreeMap<String, RawValue>,
}

impl RawExtraction {
    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.fields.get(field)
    }
}

impl fmt::Display for RawExtraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}
