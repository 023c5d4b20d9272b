pub mod bridge;

pub use bridge::OcrBridge;

use anyhow::Result;
use std::path::Path;

use crate::core::model::DetectionSet;

/// One OCR pass over one page image.
///
/// An explicitly empty set means "no text found" and is never conflated
/// with an error. Handles are constructed by the driver and passed in;
/// there is no process-wide engine singleton.
pub trait OcrEngine {
    fn recognize(&self, image: &Path) -> Result<DetectionSet>;
}
