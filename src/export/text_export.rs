use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;

use crate::core::run::RunAggregate;
use crate::export::Exporter;

/// Plain-text report: statistics header, page-by-page detections with
/// confidence, then all text combined.
#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for TextExporter {
    fn export(&self, run: &RunAggregate) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let stats = run.statistics();
        let mut report = String::new();

        report.push_str("OCR Text Extraction Results\n");
        report.push_str(&"=".repeat(50));
        report.push('\n');
        writeln!(report, "Total Pages: {}", stats.page_count)?;
        writeln!(report, "Total Text Regions: {}", stats.total_detections)?;
        writeln!(report, "Average Confidence: {:.3}", stats.mean_confidence)?;
        writeln!(report, "Export Time: {}", Local::now().to_rfc3339())?;
        report.push_str(&"=".repeat(50));
        report.push_str("\n\n");

        for page in run.pages() {
            writeln!(report, "PAGE {}", page.page)?;
            report.push_str(&"-".repeat(20));
            report.push('\n');

            if page.detections.is_empty() {
                report.push_str("No text detected on this page.\n\n");
            } else {
                for (i, detection) in page.detections.iter().enumerate() {
                    writeln!(report, "{:3}. {}", i + 1, detection.text)?;
                    writeln!(report, "     Confidence: {:.3}", detection.confidence)?;
                    report.push('\n');
                }
            }
            report.push('\n');
        }

        report.push_str("ALL TEXT COMBINED\n");
        report.push_str(&"=".repeat(20));
        report.push('\n');
        for (i, text) in run.all_text().iter().enumerate() {
            writeln!(report, "{:3}. {}", i + 1, text)?;
        }

        let path = self.out_dir.join("extracted_text.txt");
        fs::write(path, report)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use crate::core::model::Detection;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let mut out = std::env::temp_dir();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let pid = std::process::id();
        out.push(format!("{prefix}-{pid}-{now}"));
        out
    }

    #[test]
    fn writes_page_sections_and_combined_text() -> Result<()> {
        let mut run = RunAggregate::new();
        run.append(
            1,
            vec![Detection::new("Hello", 0.9, BBox::new(0.0, 0.0, 50.0, 20.0))],
            None,
        )?;
        run.append(2, vec![], None)?;

        let dir = temp_dir("textsift-text-export");
        TextExporter::new(dir.clone()).export(&run)?;

        let contents = fs::read_to_string(dir.join("extracted_text.txt"))?;
        assert!(contents.contains("Total Pages: 2"));
        assert!(contents.contains("PAGE 1"));
        assert!(contents.contains("  1. Hello"));
        assert!(contents.contains("Confidence: 0.900"));
        assert!(contents.contains("No text detected on this page."));
        assert!(contents.contains("ALL TEXT COMBINED"));

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }
}
