//! Error types for the billsheet-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the billsheet library.
#[derive(Error, Debug)]
pub enum BillsheetError {
    /// Template loading error. Always fatal for a run.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Document extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while reading template definition files.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML or does not follow the template schema.
    #[error("failed to parse template {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The template parsed but is unusable (missing keys, bad regex).
    #[error("invalid template '{name}' in {path}: {reason}")]
    Invalid {
        name: String,
        path: PathBuf,
        reason: String,
    },
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// OCR support was not compiled in or no model directory is configured.
    #[error("OCR is not available: {0}")]
    Unavailable(String),

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors raised while turning a document into a raw field mapping.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The document does not exist or cannot be read.
    #[error("cannot read document {path}: {reason}")]
    Document { path: PathBuf, reason: String },

    /// The document type is not handled by the selected text source.
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    /// No text could be recognized in the document.
    #[error("no text could be recognized in {0}")]
    NoText(PathBuf),

    /// pdftotext binary is missing.
    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    /// pdftotext exited with an error.
    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    /// The matching template reported required fields it could not find.
    #[error("template '{template}' matched but required fields are missing: {}", missing.join(", "))]
    MissingFields {
        template: String,
        missing: Vec<String>,
    },

    /// A matched field could not be turned into a value.
    #[error("template '{template}': field '{field}': {reason}")]
    FieldValue {
        template: String,
        field: String,
        reason: String,
    },

    /// Template matching aborted unexpectedly.
    #[error("template matching failed: {0}")]
    Matching(String),

    /// Underlying PDF failure.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// Underlying OCR failure.
    #[error(transparent)]
    Ocr(#[from] OcrError),
}

/// Result type for the billsheet library.
pub type Result<T> = std::result::Result<T, BillsheetError>;
