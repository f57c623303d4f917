//! Core library for billsheet: template-driven invoice extraction.
//!
//! This crate provides:
//! - Template loading and matching (invoice2data-style YAML templates)
//! - Text sources: embedded PDF text, poppler `pdftotext`, OCR, plain text
//! - Normalization into a fixed five-field invoice record
//! - The publisher seam and one-document run orchestration

pub mod error;
pub mod extraction;
pub mod models;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod publish;
pub mod template;

pub use error::{BillsheetError, ExtractionError, Result, TemplateError};
pub use extraction::{ExtractionOutcome, ExtractionPipeline, RawExtraction, RawValue, TextSource};
pub use models::config::BillsheetConfig;
pub use models::record::{Cell, InvoiceRecord, SheetRow};
pub use normalize::normalize;
pub use publish::{
    extract_record, load_templates, publish_record, run_document, RowPublisher, RunReport,
};
pub use template::Template;
