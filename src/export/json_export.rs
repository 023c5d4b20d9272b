use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::core::run::{RunAggregate, RunStatistics};
use crate::export::Exporter;

#[derive(Debug, Serialize)]
struct PageRecord<'a> {
    page: usize,
    texts: Vec<&'a str>,
    scores: Vec<f32>,
    boxes: Vec<[f32; 4]>,
    image_path: Option<String>,
    text_count: usize,
    avg_confidence: f32,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct Dump<'a> {
    metadata: RunStatistics,
    results: Vec<PageRecord<'a>>,
    export_time: String,
}

/// Structured dump of the run: statistics header plus the ordered page
/// records.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, run: &RunAggregate) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let results: Vec<PageRecord> = run
            .pages()
            .iter()
            .map(|page| PageRecord {
                page: page.page,
                texts: page.detections.iter().map(|d| d.text.as_str()).collect(),
                scores: page.detections.iter().map(|d| d.confidence).collect(),
                boxes: page.detections.iter().map(|d| d.bbox.to_array()).collect(),
                image_path: page
                    .image_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
                text_count: page.text_count(),
                avg_confidence: page.avg_confidence(),
                timestamp: page.timestamp.to_rfc3339(),
            })
            .collect();

        let dump = Dump {
            metadata: run.statistics(),
            results,
            export_time: Local::now().to_rfc3339(),
        };

        let path = self.out_dir.join("extracted_text.json");
        let data = serde_json::to_string_pretty(&dump)?;
        fs::write(path, data)?;
        Ok(())
    }
}
