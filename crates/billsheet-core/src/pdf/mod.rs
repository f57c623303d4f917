//! PDF access: embedded text and page images.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;
use image::DynamicImage;

/// What a PDF mostly contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfType {
    /// Contains extractable text.
    Text,
    /// Contains only images (scanned invoice).
    Image,
    /// Contains both text and images.
    Hybrid,
    /// Empty or unreadable.
    Empty,
}

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Operations the text sources need from a PDF backend.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Number of pages in the loaded PDF.
    fn page_count(&self) -> u32;

    /// Classify the PDF as text, image or hybrid.
    fn analyze(&self) -> PdfType;

    /// Extract the embedded text of the whole document.
    fn extract_text(&self) -> Result<String>;

    /// Extract the images drawn on a page (1-indexed).
    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>>;
}
