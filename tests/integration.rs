use std::fs;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;

use textsift::core::geometry::BBox;
use textsift::core::model::Detection;
use textsift::core::run::RunAggregate;
use textsift::dedup::{MergeEngine, OverlapDeduplicator};
use textsift::export::{Exporter, JsonExporter, TextExporter};
use textsift::session::SessionManager;

fn temp_output_dir(prefix: &str) -> PathBuf {
    let mut out = std::env::temp_dir();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let pid = std::process::id();
    out.push(format!("{prefix}-{pid}-{now}"));
    out
}

/// Two language passes over the same page collapse into one result set,
/// which exports with the required structure.
#[test]
fn merges_language_passes_and_exports() -> Result<()> {
    let english = vec![
        Detection::new("Hello", 0.90, BBox::new(0.0, 0.0, 50.0, 20.0)),
        Detection::new("World", 0.80, BBox::new(60.0, 0.0, 110.0, 20.0)),
    ];
    let arabic = vec![Detection::new("Hllo", 0.60, BBox::new(0.0, 0.0, 50.0, 20.0))];

    let mut combined = english.clone();
    combined.extend(arabic);

    let dedup = OverlapDeduplicator::with_threshold(0.8);
    let merged = dedup.merge(&combined)?;
    assert_eq!(merged, english);

    let mut run = RunAggregate::new();
    run.append(1, merged, Some(PathBuf::from("page_001.png")))?;

    let out = temp_output_dir("textsift-e2e");
    TextExporter::new(out.clone()).export(&run)?;
    JsonExporter::new(out.clone()).export(&run)?;

    let report = fs::read_to_string(out.join("extracted_text.txt"))?;
    assert!(report.contains("PAGE 1"));
    assert!(report.contains("Hello"));
    assert!(report.contains("ALL TEXT COMBINED"));
    assert!(!report.contains("Hllo"));

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("extracted_text.json"))?)?;
    assert_eq!(value["metadata"]["page_count"], 1);
    assert_eq!(value["metadata"]["total_detections"], 2);
    assert_eq!(value["results"][0]["texts"][0], "Hello");
    assert_eq!(value["results"][0]["text_count"], 2);
    assert!(value["export_time"].is_string());

    let _ = fs::remove_dir_all(&out);
    Ok(())
}

#[test]
fn search_spans_pages_in_order() -> Result<()> {
    let mut run = RunAggregate::new();
    run.append(
        1,
        vec![
            Detection::new("Invoice", 0.9, BBox::new(0.0, 0.0, 60.0, 20.0)),
            Detection::new("Total: 42", 0.8, BBox::new(0.0, 30.0, 60.0, 50.0)),
        ],
        None,
    )?;
    run.append(
        2,
        vec![Detection::new(
            "invoice copy",
            0.7,
            BBox::new(0.0, 0.0, 80.0, 20.0),
        )],
        None,
    )?;

    let loose = run.search("invoice", false);
    assert_eq!(loose.len(), 2);
    assert_eq!(loose[0].page, 1);
    assert_eq!(loose[1].page, 2);

    let strict = run.search("invoice", true);
    assert_eq!(strict.len(), 1);
    assert_eq!(strict[0].page, 2);

    Ok(())
}

#[test]
fn retention_keeps_the_newest_sessions() -> Result<()> {
    let base = temp_output_dir("textsift-retention-e2e");
    let manager = SessionManager::new(base.clone());

    let mut sessions = Vec::new();
    for name in ["a.png", "b.png", "c.png", "d.png", "e.png"] {
        sessions.push(manager.create(&PathBuf::from(name))?);
        sleep(Duration::from_millis(20));
    }

    let sweep = manager.enforce_retention(3)?;
    assert_eq!(sweep.deleted.len(), 2);
    assert!(sweep.failed.is_empty());

    assert!(!sessions[0].path.exists());
    assert!(!sessions[1].path.exists());
    assert!(sessions[2].path.exists());
    assert!(sessions[3].path.exists());
    assert!(sessions[4].path.exists());

    let _ = fs::remove_dir_all(&base);
    Ok(())
}

/// Full pipeline over a real image with a stub recognizer standing in for
/// the external OCR engine.
#[cfg(unix)]
#[test]
fn extracts_image_with_stub_engine() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    use textsift::pipeline::{run_document, PipelineConfig};

    let work = temp_output_dir("textsift-pipeline-e2e");
    fs::create_dir_all(&work)?;

    let image_path = work.join("page.png");
    image::RgbaImage::from_pixel(200, 100, image::Rgba([255, 255, 255, 255]))
        .save(&image_path)?;

    let script_path = work.join("stub-ocr.sh");
    fs::write(
        &script_path,
        "#!/bin/sh\necho '[{\"text\":\"Hello\",\"confidence\":0.9,\"box\":[0,0,50,20]},{\"text\":\"World\",\"confidence\":0.8,\"box\":[60,0,110,20]}]'\n",
    )?;
    fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755))?;

    let mut config = PipelineConfig::new(image_path, work.join("outputs"));
    config.languages = vec!["en".to_string(), "ar".to_string()];
    config.ocr_program = Some(script_path);

    let summary = run_document(&config)?;

    // Both passes return the same two regions; the union deduplicates.
    assert_eq!(summary.statistics.page_count, 1);
    assert_eq!(summary.statistics.total_detections, 2);
    assert!(summary.empty_pages.is_empty());

    let session = &summary.session.path;
    assert!(session.join("extracted_text.txt").exists());
    assert!(session.join("extracted_text.json").exists());
    assert!(session
        .join("visualizations")
        .join("page_annotated.png")
        .exists());

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(session.join("extracted_text.json"))?)?;
    assert_eq!(value["results"][0]["texts"].as_array().unwrap().len(), 2);

    let _ = fs::remove_dir_all(&work);
    Ok(())
}
