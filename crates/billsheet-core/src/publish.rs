//! One-document run: load templates, extract, normalize and publish a row.

use std::fmt;
use std::future::Future;
use std::path::Path;

use tracing::{error, info, warn};

use crate::error::TemplateError;
use crate::extraction::{ExtractionPipeline, TextSource};
use crate::models::config::{BillsheetConfig, FieldMap};
use crate::models::record::{InvoiceRecord, SheetRow};
use crate::normalize::normalize;
use crate::template::{read_templates_from_dir, Template};

/// Destination of normalized rows (a spreadsheet, in production).
pub trait RowPublisher {
    type Error: fmt::Display;

    /// Append one row and return the number of cells written.
    fn append_row(&self, row: &SheetRow) -> impl Future<Output = Result<u64, Self::Error>>;
}

/// What happened to the document of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    /// The record was appended.
    Published { record: InvoiceRecord, cells: u64 },

    /// Nothing was extracted, so nothing was published.
    NoRecord,

    /// A record was extracted but the publisher failed.
    PublishFailed { record: InvoiceRecord, reason: String },
}

/// Load the template collection named by the configuration.
pub fn load_templates(config: &BillsheetConfig) -> Result<Vec<Template>, TemplateError> {
    let templates = read_templates_from_dir(&config.templates.dir, &config.templates.extensions)?;
    if templates.is_empty() {
        warn!(
            "No templates found in {}, no document can match",
            config.templates.dir.display()
        );
    }
    Ok(templates)
}

/// Extract and normalize one document. `None` when no template matched or
/// extraction failed.
pub fn extract_record(
    templates: &[Template],
    document: &Path,
    source: &dyn TextSource,
    fields: &FieldMap,
) -> Option<InvoiceRecord> {
    let outcome = ExtractionPipeline::new(templates).extract(document, source);
    let record = normalize(outcome.into_extraction().as_ref(), fields);
    match &record {
        Some(record) => info!("Invoice record: {}", record_summary(record)),
        None => warn!("No invoice data extracted from {}", document.display()),
    }
    record
}

/// Append an extracted record as one row.
pub async fn publish_record<P: RowPublisher>(record: InvoiceRecord, publisher: &P) -> RunReport {
    match publisher.append_row(&record.to_row()).await {
        Ok(cells) => {
            info!("{} cells appended.", cells);
            RunReport::Published { record, cells }
        }
        Err(e) => {
            error!("An error occurred: {}", e);
            RunReport::PublishFailed {
                record,
                reason: e.to_string(),
            }
        }
    }
}

/// Run the full chain for one document and publish at most one row.
pub async fn run_document<P: RowPublisher>(
    config: &BillsheetConfig,
    templates: &[Template],
    document: &Path,
    source: &dyn TextSource,
    publisher: &P,
) -> RunReport {
    match extract_record(templates, document, source, &config.extraction.fields) {
        Some(record) => publish_record(record, publisher).await,
        None => RunReport::NoRecord,
    }
}

fn record_summary(record: &InvoiceRecord) -> String {
    serde_json::to_string(record).unwrap_or_else(|_| format!("{:?}", record))
}
