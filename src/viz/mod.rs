use anyhow::{Context, Result};
use image::Rgba;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::model::Detection;

const BOX_COLOR: Rgba<u8> = Rgba([255, 64, 64, 255]);

/// Writes a copy of a page image with detection boxes outlined.
///
/// A best-effort side channel: callers log and skip on failure, the run is
/// never aborted by it.
#[derive(Debug, Clone)]
pub struct PageAnnotator {
    out_dir: PathBuf,
}

impl PageAnnotator {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn annotate(&self, image_path: &Path, detections: &[Detection]) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;

        let img = image::ImageReader::open(image_path)
            .with_context(|| format!("failed to open {}", image_path.display()))?
            .decode()
            .with_context(|| format!("failed to decode {}", image_path.display()))?;
        let mut canvas = img.to_rgba8();
        let (img_width, img_height) = canvas.dimensions();

        for detection in detections {
            let bbox = &detection.bbox;
            let x0 = bbox.x0.max(0.0) as u32;
            let y0 = bbox.y0.max(0.0) as u32;
            let x1 = (bbox.x1.min(img_width as f32)) as u32;
            let y1 = (bbox.y1.min(img_height as f32)) as u32;
            if x1 <= x0 || y1 <= y0 {
                continue;
            }
            let rect = Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0, y1 - y0);
            draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
        }

        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".to_string());
        let output_path = self.out_dir.join(format!("{stem}_annotated.png"));
        canvas
            .save(&output_path)
            .with_context(|| format!("failed to save {}", output_path.display()))?;

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use image::RgbaImage;
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
    fn writes_annotated_copy() -> Result<()> {
        let dir = temp_dir("textsift-viz");
        fs::create_dir_all(&dir)?;
        let image_path = dir.join("page.png");
        RgbaImage::from_pixel(100, 80, Rgba([255, 255, 255, 255])).save(&image_path)?;

        let annotator = PageAnnotator::new(dir.join("visualizations"));
        let detections = vec![
            Detection::new("Hello", 0.9, BBox::new(5.0, 5.0, 40.0, 20.0)),
            // Out-of-bounds box gets clamped rather than failing.
            Detection::new("Edge", 0.8, BBox::new(80.0, 60.0, 150.0, 120.0)),
            // Degenerate box is skipped.
            Detection::new("", 0.5, BBox::new(10.0, 10.0, 10.0, 10.0)),
        ];
        let out = annotator.annotate(&image_path, &detections)?;

        assert!(out.exists());
        assert!(out.file_name().unwrap().to_string_lossy().ends_with("page_annotated.png"));

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }
}
