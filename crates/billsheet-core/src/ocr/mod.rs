//! OCR for scanned invoices, backed by `pure-onnx-ocr`.

#[cfg(feature = "native")]
mod engine;

#[cfg(feature = "native")]
pub use engine::OcrEngine;

use serde::{Deserialize, Serialize};

/// Model files expected in an OCR model directory.
pub const DETECTION_MODEL: &str = "det.onnx";
pub const RECOGNITION_MODEL: &str = "latin_rec.onnx";
pub const DICTIONARY: &str = "latin_dict.txt";

/// True when `dir` holds every model file the engine needs.
pub fn models_present(dir: &std::path::Path) -> bool {
    [DETECTION_MODEL, RECOGNITION_MODEL, DICTIONARY]
        .iter()
        .all(|f| dir.join(f).is_file())
}

/// A recognized line of text with its quadrilateral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Corner coordinates (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    /// Recognized text.
    pub text: String,
}

impl TextBox {
    /// Axis-aligned bounding rectangle (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Result of OCR on one image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrResult {
    /// Boxes in reading order.
    pub boxes: Vec<TextBox>,

    /// Full text (boxes in reading order, one row per line).
    pub text: String,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl OcrResult {
    /// Build a result from unordered boxes.
    pub fn from_boxes(mut boxes: Vec<TextBox>, processing_time_ms: u64) -> Self {
        sort_by_reading_order(&mut boxes);
        let text = join_rows(&boxes);
        Self {
            boxes,
            text,
            processing_time_ms,
        }
    }
}

/// Vertical tolerance (pixels) for boxes to share a row.
const ROW_HEIGHT: f32 = 20.0;

fn row_of(b: &TextBox) -> i32 {
    (b.rect().1 / ROW_HEIGHT) as i32
}

/// Sort top-to-bottom, then left-to-right within a row.
fn sort_by_reading_order(boxes: &mut [TextBox]) {
    boxes.sort_by(|a, b| {
        row_of(a).cmp(&row_of(b)).then_with(|| {
            a.rect()
                .0
                .partial_cmp(&b.rect().0)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });
}

/// Boxes on the same row are joined with spaces so label and value stay on
/// one line for the template regexes.
fn join_rows(boxes: &[TextBox]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current_row = None;

    for b in boxes {
        let row = row_of(b);
        match lines.last_mut() {
            Some(line) if current_row == Some(row) => {
                line.push(' ');
                line.push_str(&b.text);
            }
            _ => lines.push(b.text.clone()),
        }
        current_row = Some(row);
    }

    lines.join("\n")
}
