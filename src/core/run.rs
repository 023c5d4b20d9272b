use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;

use crate::core::error::CoreError;
use crate::core::geometry::BBox;
use crate::core::model::{DetectionSet, PageResult};

/// Document-level statistics, computed on demand from the stored pages.
///
/// Over zero detections every confidence figure is 0.0; "no text found" is
/// a normal outcome, not an error, and must never surface as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunStatistics {
    pub page_count: usize,
    pub total_detections: usize,
    pub mean_confidence: f32,
    pub min_confidence: f32,
    pub max_confidence: f32,
}

/// One match from [`RunAggregate::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub page: usize,
    /// 1-based position within the page's post-dedup detections.
    pub text_index: usize,
    pub text: String,
    pub confidence: f32,
    pub bbox: BBox,
}

/// Ordered per-page results for one document-processing run.
///
/// Owned exclusively by the thread driving the run; pages are appended in
/// strictly increasing order starting at 1 and never mutated afterwards.
#[derive(Debug, Default)]
pub struct RunAggregate {
    pages: Vec<PageResult>,
}

impl RunAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores one page's deduplicated detections with a timestamp captured
    /// at call time. Fails with [`CoreError::Sequence`] unless `page` is
    /// exactly one past the previous maximum (1 for the first call), and
    /// with [`CoreError::Validation`] if any detection is malformed.
    pub fn append(
        &mut self,
        page: usize,
        detections: DetectionSet,
        image_path: Option<PathBuf>,
    ) -> Result<(), CoreError> {
        let expected = self.pages.len() + 1;
        if page != expected {
            return Err(CoreError::Sequence {
                expected,
                got: page,
            });
        }
        for detection in &detections {
            detection.validate()?;
        }
        self.pages.push(PageResult {
            page,
            detections,
            image_path,
            timestamp: Local::now(),
        });
        Ok(())
    }

    pub fn pages(&self) -> &[PageResult] {
        &self.pages
    }

    pub fn statistics(&self) -> RunStatistics {
        let scores: Vec<f32> = self
            .pages
            .iter()
            .flat_map(|p| p.detections.iter().map(|d| d.confidence))
            .collect();

        if scores.is_empty() {
            return RunStatistics {
                page_count: self.pages.len(),
                total_detections: 0,
                mean_confidence: 0.0,
                min_confidence: 0.0,
                max_confidence: 0.0,
            };
        }

        let sum: f32 = scores.iter().sum();
        let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        RunStatistics {
            page_count: self.pages.len(),
            total_detections: scores.len(),
            mean_confidence: sum / scores.len() as f32,
            min_confidence: min,
            max_confidence: max,
        }
    }

    /// Every page's texts in page order, preserving each page's post-dedup
    /// order.
    pub fn all_text(&self) -> Vec<String> {
        self.pages
            .iter()
            .flat_map(|p| p.detections.iter().map(|d| d.text.clone()))
            .collect()
    }

    /// Substring search over all stored texts, page-then-within-page order.
    /// Case-insensitive unless `case_sensitive` is set.
    pub fn search(&self, term: &str, case_sensitive: bool) -> Vec<SearchHit> {
        let needle = if case_sensitive {
            term.to_string()
        } else {
            term.to_lowercase()
        };

        let mut hits = Vec::new();
        for page in &self.pages {
            for (idx, detection) in page.detections.iter().enumerate() {
                let haystack = if case_sensitive {
                    detection.text.clone()
                } else {
                    detection.text.to_lowercase()
                };
                if haystack.contains(&needle) {
                    hits.push(SearchHit {
                        page: page.page,
                        text_index: idx + 1,
                        text: detection.text.clone(),
                        confidence: detection.confidence,
                        bbox: detection.bbox,
                    });
                }
            }
        }
        hits
    }

    /// Pages that ended up with zero detections, for the run summary.
    pub fn empty_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|p| p.detections.is_empty())
            .map(|p| p.page)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Detection;
    use pretty_assertions::assert_eq;

    fn det(text: &str, confidence: f32) -> Detection {
        Detection::new(text, confidence, BBox::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn appends_in_order() {
        let mut run = RunAggregate::new();
        run.append(1, vec![det("a", 0.9)], None).unwrap();
        run.append(2, vec![det("b", 0.8)], None).unwrap();
        assert_eq!(run.pages().len(), 2);
        assert_eq!(run.pages()[1].page, 2);
    }

    #[test]
    fn rejects_out_of_sequence_page() {
        let mut run = RunAggregate::new();
        run.append(1, vec![], None).unwrap();
        let err = run.append(3, vec![], None).unwrap_err();
        assert!(matches!(err, CoreError::Sequence { expected: 2, got: 3 }));
    }

    #[test]
    fn rejects_duplicate_page() {
        let mut run = RunAggregate::new();
        run.append(1, vec![], None).unwrap();
        assert!(run.append(1, vec![], None).is_err());
    }

    #[test]
    fn rejects_malformed_detection_on_append() {
        let mut run = RunAggregate::new();
        let bad = Detection::new("x", 1.5, BBox::new(0.0, 0.0, 10.0, 10.0));
        assert!(matches!(
            run.append(1, vec![bad], None),
            Err(CoreError::Validation { .. })
        ));
        assert!(run.pages().is_empty());
    }

    #[test]
    fn empty_run_statistics_are_zero() {
        let run = RunAggregate::new();
        let stats = run.statistics();
        assert_eq!(stats.page_count, 0);
        assert_eq!(stats.total_detections, 0);
        assert_eq!(stats.mean_confidence, 0.0);
        assert_eq!(stats.min_confidence, 0.0);
        assert_eq!(stats.max_confidence, 0.0);
    }

    #[test]
    fn all_empty_pages_report_zero_statistics() {
        let mut run = RunAggregate::new();
        run.append(1, vec![], None).unwrap();
        run.append(2, vec![], None).unwrap();
        let stats = run.statistics();
        assert_eq!(stats.page_count, 2);
        assert_eq!(stats.total_detections, 0);
        assert_eq!(stats.mean_confidence, 0.0);
        assert_eq!(stats.min_confidence, 0.0);
        assert_eq!(stats.max_confidence, 0.0);
        assert_eq!(run.empty_pages(), vec![1, 2]);
    }

    #[test]
    fn statistics_flatten_all_pages() {
        let mut run = RunAggregate::new();
        run.append(1, vec![det("a", 0.9), det("b", 0.5)], None).unwrap();
        run.append(2, vec![det("c", 0.7)], None).unwrap();
        let stats = run.statistics();
        assert_eq!(stats.page_count, 2);
        assert_eq!(stats.total_detections, 3);
        assert_eq!(stats.min_confidence, 0.5);
        assert_eq!(stats.max_confidence, 0.9);
        assert!((stats.mean_confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn all_text_preserves_page_order() {
        let mut run = RunAggregate::new();
        run.append(1, vec![det("first", 0.9), det("second", 0.8)], None)
            .unwrap();
        run.append(2, vec![det("third", 0.7)], None).unwrap();
        assert_eq!(run.all_text(), vec!["first", "second", "third"]);
    }

    #[test]
    fn search_is_case_insensitive_by_default() {
        let mut run = RunAggregate::new();
        run.append(1, vec![det("Invoice", 0.9), det("Total: 42", 0.8)], None)
            .unwrap();
        run.append(2, vec![det("invoice copy", 0.7)], None).unwrap();

        let hits = run.search("invoice", false);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].page, 1);
        assert_eq!(hits[0].text_index, 1);
        assert_eq!(hits[1].page, 2);

        let exact = run.search("invoice", true);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].page, 2);
        assert_eq!(exact[0].text, "invoice copy");
    }
}
