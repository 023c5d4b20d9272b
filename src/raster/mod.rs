use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Pdf,
}

/// Decides how an input is processed from its extension: images are a
/// single page, PDFs are rasterized page by page.
pub fn detect_input_kind(path: &Path) -> Option<InputKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if ext == "pdf" {
        Some(InputKind::Pdf)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(InputKind::Image)
    } else {
        None
    }
}

/// Page inventory for a PDF input, via `pdfinfo`.
#[derive(Debug, Clone)]
pub struct PdfPages {
    path: PathBuf,
}

impl PdfPages {
    pub fn new(path: PathBuf) -> Result<Self> {
        Ok(Self { path })
    }

    pub fn page_count(&self) -> Result<usize> {
        let output = Command::new("pdfinfo")
            .arg(&self.path)
            .output()
            .with_context(|| format!("failed to invoke pdfinfo on {}", self.path.display()))?;

        if !output.status.success() {
            anyhow::bail!("pdfinfo failed with status: {}", output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            if let Some(rest) = line.strip_prefix("Pages:") {
                let num_str = rest.trim();
                let pages: usize = num_str.parse().with_context(|| {
                    format!("failed to parse page count from 'Pages:' line: {num_str}")
                })?;
                return Ok(pages);
            }
        }

        anyhow::bail!(
            "pdfinfo output did not contain a 'Pages:' line for {}",
            self.path.display()
        );
    }
}

/// Renders single PDF pages to PNG via `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    out_dir: PathBuf,
    dpi: u32,
}

impl PageRenderer {
    pub fn new(out_dir: PathBuf, dpi: u32) -> Self {
        Self { out_dir, dpi }
    }

    /// Renders one page (1-based) and returns the image path.
    pub fn render_page(&self, pdf_path: &Path, page: usize) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;

        let prefix = self.out_dir.join(format!("page_{page:03}"));
        let prefix_str = prefix
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("non-UTF8 output path not supported"))?;

        let status = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg(pdf_path)
            .arg(prefix_str)
            .status()
            .with_context(|| "failed to invoke pdftoppm; is poppler-utils installed?")?;

        if !status.success() {
            anyhow::bail!("pdftoppm failed with status: {status}");
        }

        // pdftoppm names the output `<prefix>-<page>.png`.
        let image_path = self.out_dir.join(format!("page_{page:03}-{page}.png"));

        if !image_path.exists() {
            anyhow::bail!(
                "expected rendered image not found: {}",
                image_path.display()
            );
        }

        Ok(image_path)
    }
}
