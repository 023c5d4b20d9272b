use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::geometry::BBox;
use crate::core::model::{Detection, DetectionSet};
use crate::ocr::OcrEngine;

/// Wire shape emitted by the external recognizer, one element per detected
/// region.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDetection {
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
}

fn default_confidence() -> f32 {
    0.5
}

/// Invokes an external OCR process per page and parses its JSON output.
#[derive(Debug, Clone)]
pub struct OcrBridge {
    program: PathBuf,
    lang: String,
}

impl OcrBridge {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from("textsift-ocr"),
            lang: lang.into(),
        }
    }

    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program = program;
        self
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn run(&self, image: &Path) -> Result<DetectionSet> {
        let output = Command::new(&self.program)
            .arg("--image")
            .arg(image)
            .arg("--lang")
            .arg(&self.lang)
            .output()
            .with_context(|| {
                format!("failed to invoke OCR engine {}", self.program.display())
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("OCR engine failed for lang {}: {stderr}", self.lang);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let raw: Vec<RawDetection> =
            serde_json::from_str(&stdout).with_context(|| "failed to parse OCR JSON response")?;

        Ok(raw
            .into_iter()
            .map(|r| {
                Detection::new(
                    r.text,
                    r.confidence,
                    BBox::new(r.bbox[0], r.bbox[1], r.bbox[2], r.bbox[3]),
                )
            })
            .collect())
    }
}

impl OcrEngine for OcrBridge {
    fn recognize(&self, image: &Path) -> Result<DetectionSet> {
        self.run(image)
    }
}
