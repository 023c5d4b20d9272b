use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::core::error::CoreError;
use crate::core::geometry::BBox;

/// One recognized text instance from an OCR pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub text: String,
    pub confidence: f32,
    pub bbox: BBox,
}

/// Ordered detections from one OCR pass over one page, in engine emission
/// order.
pub type DetectionSet = Vec<Detection>;

impl Detection {
    pub fn new(text: impl Into<String>, confidence: f32, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox,
        }
    }

    /// Rejects detections that must not enter the core: non-finite or
    /// inverted boxes and out-of-range confidences. Zero-area boxes with
    /// ordered edges pass; geometry defines their overlap as 0.
    pub fn validate(&self) -> Result<(), CoreError> {
        let b = &self.bbox;
        if !(b.x0.is_finite() && b.y0.is_finite() && b.x1.is_finite() && b.y1.is_finite()) {
            return Err(CoreError::validation(format!(
                "non-finite bbox ({}, {}, {}, {})",
                b.x0, b.y0, b.x1, b.y1
            )));
        }
        if b.x0 > b.x1 || b.y0 > b.y1 {
            return Err(CoreError::validation(format!(
                "inverted bbox ({}, {}, {}, {})",
                b.x0, b.y0, b.x1, b.y1
            )));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(CoreError::validation(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// One page's finalized state. Immutable once appended to a run.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub page: usize,
    pub detections: DetectionSet,
    pub image_path: Option<PathBuf>,
    pub timestamp: DateTime<Local>,
}

impl PageResult {
    pub fn text_count(&self) -> usize {
        self.detections.len()
    }

    pub fn avg_confidence(&self) -> f32 {
        if self.detections.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.detections.iter().map(|d| d.confidence).sum();
        sum / self.detections.len() as f32
    }
}
