//! Text sources: how a document becomes text before template matching.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{ExtractionError, OcrError};
use crate::models::config::{ExtractionConfig, TextSourceKind};
use crate::pdf::{PdfExtractor, PdfProcessor, PdfType};

use super::{Result, TextSource};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn read_document(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| ExtractionError::Document {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Build the text source selected in the configuration.
pub fn text_source_for(config: &ExtractionConfig) -> Box<dyn TextSource> {
    let ocr = config.ocr_model_dir.clone().map(OcrSource::new);
    match config.text_source {
        TextSourceKind::Auto => Box::new(AutoTextSource::new(config.min_text_length, ocr)),
        TextSourceKind::Embedded => Box::new(EmbeddedPdfSource),
        TextSourceKind::Pdftotext => Box::new(PdftotextSource),
        TextSourceKind::Plain => Box::new(PlainTextSource),
        TextSourceKind::Ocr => Box::new(ocr.unwrap_or_else(|| OcrSource::new(PathBuf::new()))),
    }
}

/// Reads `.txt` documents as they are.
pub struct PlainTextSource;

impl TextSource for PlainTextSource {
    fn document_text(&self, path: &Path) -> Result<String> {
        let bytes = read_document(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn name(&self) -> &str {
        "plain text"
    }
}

/// Text embedded in the PDF (lopdf + pdf-extract).
pub struct EmbeddedPdfSource;

impl TextSource for EmbeddedPdfSource {
    fn document_text(&self, path: &Path) -> Result<String> {
        let data = read_document(path)?;
        let mut extractor = PdfExtractor::new();
        extractor.load(&data)?;
        debug!("PDF has {} pages", extractor.page_count());
        Ok(extractor.extract_text()?)
    }

    fn name(&self) -> &str {
        "embedded PDF text"
    }
}

/// Poppler's `pdftotext -layout`, which keeps labels and values on one line.
pub struct PdftotextSource;

impl PdftotextSource {
    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl TextSource for PdftotextSource {
    fn document_text(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(ExtractionError::Document {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }

        let output = Command::new("pdftotext")
            .arg("-layout")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractionError::PdftotextNotFound
                } else {
                    ExtractionError::Document {
                        path: path.to_path_buf(),
                        reason: format!("pdftotext failed: {}", e),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(ExtractionError::PdftotextFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &str {
        "pdftotext"
    }
}

/// OCR over an image file or the images of a scanned PDF.
pub struct OcrSource {
    model_dir: PathBuf,
}

impl OcrSource {
    pub fn new(model_dir: PathBuf) -> Self {
        Self { model_dir }
    }

    #[cfg(feature = "native")]
    fn recognize(&self, path: &Path) -> Result<String> {
        use crate::ocr::OcrEngine;

        let images = if IMAGE_EXTENSIONS.contains(&extension(path).as_str()) {
            let image = image::open(path).map_err(|e| OcrError::InvalidImage(e.to_string()))?;
            vec![image]
        } else {
            let data = read_document(path)?;
            let mut extractor = PdfExtractor::new();
            extractor.load(&data)?;

            let mut images = Vec::new();
            for page in 1..=extractor.page_count() {
                match extractor.extract_images(page) {
                    Ok(found) => images.extend(found),
                    Err(e) => warn!("Failed to extract images from page {}: {}", page, e),
                }
            }
            images
        };

        if images.is_empty() {
            return Err(ExtractionError::NoText(path.to_path_buf()));
        }

        let engine = OcrEngine::from_dir(&self.model_dir)?;
        let mut texts = Vec::new();
        let total = images.len();
        for (i, image) in images.iter().enumerate() {
            match engine.process(image) {
                Ok(result) if !result.text.trim().is_empty() => texts.push(result.text),
                Ok(_) => debug!("No text detected in image {}/{}", i + 1, total),
                Err(e) => warn!("OCR failed for image {}/{}: {}", i + 1, total, e),
            }
        }

        if texts.is_empty() {
            return Err(ExtractionError::NoText(path.to_path_buf()));
        }
        Ok(texts.join("\n\n"))
    }

    #[cfg(not(feature = "native"))]
    fn recognize(&self, _path: &Path) -> Result<String> {
        Err(OcrError::Unavailable("built without the `native` feature".to_string()).into())
    }
}

impl TextSource for OcrSource {
    fn document_text(&self, path: &Path) -> Result<String> {
        if !crate::ocr::models_present(&self.model_dir) {
            return Err(OcrError::Unavailable(format!(
                "OCR models not found in '{}'",
                self.model_dir.display()
            ))
            .into());
        }
        self.recognize(path)
    }

    fn name(&self) -> &str {
        "OCR"
    }
}

/// Picks a source from the document type: plain text, OCR for images,
/// embedded PDF text with OCR fallback for scans.
pub struct AutoTextSource {
    min_text_length: usize,
    ocr: Option<OcrSource>,
}

impl AutoTextSource {
    pub fn new(min_text_length: usize, ocr: Option<OcrSource>) -> Self {
        Self {
            min_text_length,
            ocr,
        }
    }

    fn ocr_or_unavailable(&self, path: &Path) -> Result<String> {
        match &self.ocr {
            Some(ocr) => ocr.document_text(path),
            None => Err(OcrError::Unavailable(
                "no ocr_model_dir configured".to_string(),
            )
            .into()),
        }
    }

    fn pdf_text(&self, path: &Path) -> Result<String> {
        let data = read_document(path)?;
        let mut extractor = PdfExtractor::new();
        extractor.load(&data)?;

        let pdf_type = extractor.analyze();
        debug!("PDF type: {:?}", pdf_type);

        match pdf_type {
            PdfType::Empty => Err(ExtractionError::NoText(path.to_path_buf())),
            PdfType::Image => self.ocr_or_unavailable(path),
            PdfType::Text | PdfType::Hybrid => {
                let text = extractor.extract_text()?;
                match &self.ocr {
                    Some(ocr) if text.trim().len() < self.min_text_length => {
                        warn!("PDF has insufficient embedded text, falling back to OCR");
                        ocr.document_text(path).or_else(|e| {
                            warn!("OCR fallback failed, keeping embedded text: {}", e);
                            Ok(text)
                        })
                    }
                    _ => Ok(text),
                }
            }
        }
    }
}

impl TextSource for AutoTextSource {
    fn document_text(&self, path: &Path) -> Result<String> {
        let ext = extension(path);
        match ext.as_str() {
            "txt" => PlainTextSource.document_text(path),
            e if IMAGE_EXTENSIONS.contains(&e) => self.ocr_or_unavailable(path),
            "pdf" => self.pdf_text(path),
            other => Err(ExtractionError::UnsupportedDocument(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }

    fn name(&self) -> &str {
        "auto"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.txt");
        std::fs::write(&path, "VendorA Inc.\nTotal: 120.00").unwrap();

        let text = AutoTextSource::new(50, None).document_text(&path).unwrap();
        assert!(text.contains("VendorA Inc."));
    }

    #[test]
    fn test_missing_document() {
        let err = AutoTextSource::new(50, None)
            .document_text(Path::new("/nonexistent/Invoice.pdf"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Document { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = AutoTextSource::new(50, None)
            .document_text(Path::new("invoice.docx"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedDocument(_)));
    }

    #[test]
    fn test_image_without_ocr() {
        let err = AutoTextSource::new(50, None)
            .document_text(Path::new("scan.png"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Ocr(OcrError::Unavailable(_))));
    }

    #[test]
    fn test_ocr_without_models() {
        let dir = tempfile::tempdir().unwrap();
        let err = OcrSource::new(dir.path().to_path_buf())
            .document_text(Path::new("scan.png"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Ocr(OcrError::Unavailable(_))));
    }

    #[test]
    fn test_source_selection() {
        let mut config = ExtractionConfig::default();
        assert_eq!(text_source_for(&config).name(), "auto");
        config.text_source = TextSourceKind::Pdftotext;
        assert_eq!(text_source_for(&config).name(), "pdftotext");
        config.text_source = TextSourceKind::Ocr;
        assert_eq!(text_source_for(&config).name(), "OCR");
    }
}
