//! Template-driven extraction over a recognized document.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::error::ExtractionError;
use crate::template::Template;

use super::{RawExtraction, TextSource};

/// Outcome of extracting one document.
///
/// Failures of the text source or the matching template never escape the
/// pipeline; they are reported here instead.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// A template matched and produced a field mapping.
    Extracted(RawExtraction),

    /// Text was recognized but no template matched it.
    NoMatch,

    /// Text recognition or field extraction failed.
    Failed(ExtractionError),
}

impl ExtractionOutcome {
    /// The raw mapping, if any.
    pub fn into_extraction(self) -> Option<RawExtraction> {
        match self {
            Self::Extracted(raw) => Some(raw),
            Self::NoMatch | Self::Failed(_) => None,
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, Self::Extracted(_))
    }
}

/// Runs a document through a text source and the template collection.
pub struct ExtractionPipeline<'a> {
    templates: &'a [Template],
}

impl<'a> ExtractionPipeline<'a> {
    /// Create a pipeline over a loaded template collection. The collection
    /// is only read, so one collection can serve many documents.
    pub fn new(templates: &'a [Template]) -> Self {
        Self { templates }
    }

    /// Recognize `document` and extract its fields with the first matching
    /// template.
    pub fn extract(&self, document: &Path, source: &dyn TextSource) -> ExtractionOutcome {
        info!(
            "Extracting text from {} using {}...",
            document.display(),
            source.name()
        );
        let start = Instant::now();

        let text = match panic::catch_unwind(AssertUnwindSafe(|| source.document_text(document))) {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                error!("Error during extraction: {}", e);
                return ExtractionOutcome::Failed(e);
            }
            Err(_) => {
                error!("Error during extraction: text source '{}' panicked", source.name());
                return ExtractionOutcome::Failed(ExtractionError::Document {
                    path: document.to_path_buf(),
                    reason: format!("text source '{}' panicked", source.name()),
                });
            }
        };

        if text.trim().is_empty() {
            let e = ExtractionError::NoText(document.to_path_buf());
            error!("Error during extraction: {}", e);
            return ExtractionOutcome::Failed(e);
        }

        debug!(
            "Recognized {} characters in {:?}",
            text.chars().count(),
            start.elapsed()
        );

        self.extract_text(&text)
    }

    /// Match already recognized text against the templates.
    pub fn extract_text(&self, text: &str) -> ExtractionOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.match_templates(text))) {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Error during extraction: template matching panicked");
                ExtractionOutcome::Failed(ExtractionError::Matching(
                    "template matching panicked".to_string(),
                ))
            }
        }
    }

    fn match_templates(&self, text: &str) -> ExtractionOutcome {
        for template in self.templates {
            let prepared = template.prepare_input(text);
            if !template.matches_input(&prepared) {
                debug!("Template '{}' does not match", template.name());
                continue;
            }

            info!(
                "Matched template '{}' ({})",
                template.name(),
                template.issuer()
            );

            return match template.extract(&prepared) {
                Ok(raw) => {
                    info!("Data extracted: {}", raw);
                    ExtractionOutcome::Extracted(raw)
                }
                Err(e) => {
                    error!("Error during extraction: {}", e);
                    ExtractionOutcome::Failed(e)
                }
            };
        }

        warn!(
            "No template matched the document ({} templates tried)",
            self.templates.len()
        );
        ExtractionOutcome::NoMatch
    }
}
