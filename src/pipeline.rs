use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::model::DetectionSet;
use crate::core::run::{RunAggregate, RunStatistics};
use crate::dedup::{MergeEngine, OverlapDeduplicator, DEFAULT_OVERLAP_THRESHOLD};
use crate::export::{Exporter, JsonExporter, TextExporter};
use crate::ocr::{OcrBridge, OcrEngine};
use crate::raster::{detect_input_kind, InputKind, PageRenderer, PdfPages};
use crate::session::{Session, SessionManager};
use crate::viz::PageAnnotator;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output_base: PathBuf,
    /// One OCR pass per language; the union is deduplicated.
    pub languages: Vec<String>,
    pub overlap_threshold: f32,
    pub dpi: u32,
    pub visualize: bool,
    /// Override for the external recognizer command.
    pub ocr_program: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(input: PathBuf, output_base: PathBuf) -> Self {
        Self {
            input,
            output_base,
            languages: vec!["en".to_string()],
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            dpi: 300,
            visualize: true,
            ocr_program: None,
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub session: Session,
    pub statistics: RunStatistics,
    /// `(page, detection count)` in page order.
    pub page_counts: Vec<(usize, usize)>,
    pub empty_pages: Vec<usize>,
}

/// Runs one document end to end: allocate the session, then per page
/// OCR passes, dedup, aggregate, best-effort annotation; exports at the
/// end. Retention over old sessions is a separate explicit operation.
pub fn run_document(config: &PipelineConfig) -> Result<RunSummary> {
    let kind = detect_input_kind(&config.input)
        .ok_or_else(|| anyhow::anyhow!("unsupported input format: {}", config.input.display()))?;

    let manager = SessionManager::new(config.output_base.clone());
    let session = manager
        .create(&config.input)
        .with_context(|| "failed to allocate session directory")?;

    let engines: Vec<OcrBridge> = config
        .languages
        .iter()
        .map(|lang| {
            let bridge = OcrBridge::new(lang.clone());
            match &config.ocr_program {
                Some(program) => bridge.with_program(program.clone()),
                None => bridge,
            }
        })
        .collect();
    let dedup = OverlapDeduplicator::with_threshold(config.overlap_threshold);
    let annotator = config
        .visualize
        .then(|| PageAnnotator::new(session.path.join("visualizations")));

    let mut run = RunAggregate::new();

    match kind {
        InputKind::Image => {
            process_page(&mut run, 1, &config.input, &engines, &dedup, annotator.as_ref())?;
        }
        InputKind::Pdf => {
            let pdf = PdfPages::new(config.input.clone())?;
            let page_count = pdf.page_count()?;
            let renderer = PageRenderer::new(session.path.join("pages"), config.dpi);

            for page in 1..=page_count {
                match renderer.render_page(&config.input, page) {
                    Ok(image) => {
                        process_page(&mut run, page, &image, &engines, &dedup, annotator.as_ref())?;
                    }
                    Err(err) => {
                        // Rasterization failure degrades to an empty page.
                        warn!(page, error = %err, "page rasterization failed");
                        run.append(page, DetectionSet::new(), None)?;
                    }
                }
            }
        }
    }

    TextExporter::new(session.path.clone()).export(&run)?;
    JsonExporter::new(session.path.clone()).export(&run)?;

    let page_counts = run
        .pages()
        .iter()
        .map(|p| (p.page, p.detections.len()))
        .collect();

    Ok(RunSummary {
        statistics: run.statistics(),
        page_counts,
        empty_pages: run.empty_pages(),
        session,
    })
}

fn process_page(
    run: &mut RunAggregate,
    page: usize,
    image: &Path,
    engines: &[OcrBridge],
    dedup: &OverlapDeduplicator,
    annotator: Option<&PageAnnotator>,
) -> Result<()> {
    let mut combined = DetectionSet::new();
    for engine in engines {
        match engine.recognize(image) {
            Ok(detections) => {
                info!(page, lang = engine.lang(), count = detections.len(), "OCR pass");
                combined.extend(detections);
            }
            Err(err) => {
                // An engine failure is zero detections for this pass, not a
                // run failure.
                warn!(page, lang = engine.lang(), error = %err, "OCR pass failed");
            }
        }
    }

    let merged = dedup.merge(&combined)?;
    run.append(page, merged, Some(image.to_path_buf()))?;

    if let Some(annotator) = annotator {
        if let Some(stored) = run.pages().last() {
            if !stored.detections.is_empty() {
                if let Err(err) = annotator.annotate(image, &stored.detections) {
                    warn!(page, error = %err, "skipping page visualization");
                }
            }
        }
    }

    Ok(())
}
