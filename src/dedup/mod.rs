use crate::core::error::CoreError;
use crate::core::model::{Detection, DetectionSet};

pub const DEFAULT_OVERLAP_THRESHOLD: f32 = 0.8;

/// Merges a combined detection list (typically the concatenation of
/// per-language passes over one page) into a list with overlapping
/// duplicates collapsed.
pub trait MergeEngine {
    fn merge(&self, detections: &[Detection]) -> Result<DetectionSet, CoreError>;
}

/// Geometric deduplicator: two detections are duplicates when the overlap
/// ratio of their boxes strictly exceeds the threshold. Text content is
/// never compared; the higher confidence wins.
#[derive(Debug, Clone)]
pub struct OverlapDeduplicator {
    threshold: f32,
}

impl OverlapDeduplicator {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_OVERLAP_THRESHOLD,
        }
    }

    pub fn with_threshold(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Default for OverlapDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeEngine for OverlapDeduplicator {
    /// Single pass with a linear scan against the accepted entries, O(n²)
    /// worst case; page detection counts are small.
    ///
    /// First match wins: an incoming duplicate replaces the matched slot's
    /// text/confidence/box in place only when its confidence is strictly
    /// greater, and never moves the slot. Survivor order is therefore the
    /// first-seen order, so downstream enumeration is deterministic.
    fn merge(&self, detections: &[Detection]) -> Result<DetectionSet, CoreError> {
        let mut accepted: DetectionSet = Vec::new();

        for incoming in detections {
            incoming.validate()?;

            let mut matched = false;
            for kept in accepted.iter_mut() {
                if incoming.bbox.overlap_ratio(&kept.bbox) > self.threshold {
                    if incoming.confidence > kept.confidence {
                        *kept = incoming.clone();
                    }
                    matched = true;
                    break;
                }
            }
            if !matched {
                accepted.push(incoming.clone());
            }
        }

        Ok(accepted)
    }
}
