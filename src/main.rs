use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use textsift::pipeline::{run_document, PipelineConfig, RunSummary};
use textsift::raster::PdfPages;
use textsift::session::SessionManager;

#[derive(Parser, Debug)]
#[command(name = "textsift")]
#[command(version, about = "Merge multi-pass OCR detections into deduplicated, versioned session outputs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract text from an image or PDF into a new session
    Extract {
        /// Input image or PDF path
        input: PathBuf,

        /// Base directory holding session folders
        #[arg(short, long, default_value = "ocr_outputs")]
        output: PathBuf,

        /// Language codes; one OCR pass per language
        #[arg(short, long, value_delimiter = ',', default_value = "en")]
        languages: Vec<String>,

        /// Box overlap ratio above which detections merge
        #[arg(long, default_value_t = 0.8)]
        threshold: f32,

        /// Rasterization DPI for PDF inputs
        #[arg(long, default_value_t = 300)]
        dpi: u32,

        /// External recognizer command
        #[arg(long)]
        ocr_program: Option<PathBuf>,

        /// Skip annotated-image rendering
        #[arg(long)]
        no_viz: bool,

        /// Disable progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Process multiple inputs, one session each
    Batch {
        /// Input image or PDF paths
        inputs: Vec<PathBuf>,

        /// Base directory holding session folders
        #[arg(short, long, default_value = "ocr_outputs")]
        output: PathBuf,

        /// Language codes; one OCR pass per language
        #[arg(short, long, value_delimiter = ',', default_value = "en")]
        languages: Vec<String>,

        /// Box overlap ratio above which detections merge
        #[arg(long, default_value_t = 0.8)]
        threshold: f32,

        /// Rasterization DPI for PDF inputs
        #[arg(long, default_value_t = 300)]
        dpi: u32,

        /// External recognizer command
        #[arg(long)]
        ocr_program: Option<PathBuf>,

        /// Skip annotated-image rendering
        #[arg(long)]
        no_viz: bool,
    },

    /// List existing sessions, newest first
    Sessions {
        /// Base directory holding session folders
        #[arg(short, long, default_value = "ocr_outputs")]
        output: PathBuf,
    },

    /// Delete sessions beyond the retention cap
    Clean {
        /// Base directory holding session folders
        #[arg(short, long, default_value = "ocr_outputs")]
        output: PathBuf,

        /// How many recent sessions to keep
        #[arg(long, default_value_t = 3)]
        keep: usize,
    },

    /// Show information about a PDF input
    Info {
        /// Input PDF file path
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            output,
            languages,
            threshold,
            dpi,
            ocr_program,
            no_viz,
            quiet,
        } => extract_single(
            input,
            output,
            languages,
            threshold,
            dpi,
            ocr_program,
            no_viz,
            quiet,
        ),
        Commands::Batch {
            inputs,
            output,
            languages,
            threshold,
            dpi,
            ocr_program,
            no_viz,
        } => extract_batch(inputs, output, languages, threshold, dpi, ocr_program, no_viz),
        Commands::Sessions { output } => list_sessions(output),
        Commands::Clean { output, keep } => clean_sessions(output, keep),
        Commands::Info { input } => show_info(input),
    }
}

#[allow(clippy::too_many_arguments)]
fn extract_single(
    input: PathBuf,
    output: PathBuf,
    languages: Vec<String>,
    threshold: f32,
    dpi: u32,
    ocr_program: Option<PathBuf>,
    no_viz: bool,
    quiet: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }

    if !quiet {
        println!("[*] Processing: {}", input.display());
        println!("[*] Output base: {}", output.display());
        println!("[*] Languages: {}", languages.join(", "));
    }

    let mut config = PipelineConfig::new(input.clone(), output);
    config.languages = languages;
    config.overlap_threshold = threshold;
    config.dpi = dpi;
    config.ocr_program = ocr_program;
    config.visualize = !no_viz;

    let summary = run_document(&config)
        .with_context(|| format!("Failed to process: {}", input.display()))?;

    if !quiet {
        print_summary(&summary);
        println!("\n[✓] Done! Results saved to: {}", summary.session.path.display());
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let stats = &summary.statistics;
    println!("\n[*] Summary:");
    println!("    Pages processed: {}", stats.page_count);
    println!("    Text regions: {}", stats.total_detections);
    println!("    Average confidence: {:.3}", stats.mean_confidence);
    for (page, count) in &summary.page_counts {
        println!("    Page {page}: {count} text regions");
    }
    if !summary.empty_pages.is_empty() {
        let pages: Vec<String> = summary.empty_pages.iter().map(|p| p.to_string()).collect();
        println!("[!] No text detected on pages: {}", pages.join(", "));
    }
}

fn extract_batch(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    languages: Vec<String>,
    threshold: f32,
    dpi: u32,
    ocr_program: Option<PathBuf>,
    no_viz: bool,
) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }

    println!("[*] Batch processing {} file(s)", inputs.len());
    println!("[*] Output base: {}\n", output.display());

    let mut success = 0;
    let mut failed = 0;

    for (i, input) in inputs.iter().enumerate() {
        println!("[{}/{}] Processing: {}", i + 1, inputs.len(), input.display());

        if !input.exists() {
            eprintln!("  [!] Skipped: file does not exist");
            failed += 1;
            continue;
        }

        match extract_single(
            input.clone(),
            output.clone(),
            languages.clone(),
            threshold,
            dpi,
            ocr_program.clone(),
            no_viz,
            true,
        ) {
            Ok(_) => {
                println!("  [✓] Success");
                success += 1;
            }
            Err(e) => {
                eprintln!("  [✗] Failed: {e}");
                failed += 1;
            }
        }
        println!();
    }

    println!("\n[*] Summary: {success} succeeded, {failed} failed");

    if failed > 0 {
        anyhow::bail!("{failed} file(s) failed to process");
    }

    Ok(())
}

fn list_sessions(output: PathBuf) -> Result<()> {
    let manager = SessionManager::new(output.clone());
    let entries = manager.list()?;

    if entries.is_empty() {
        println!("No sessions under {}", output.display());
        return Ok(());
    }

    println!("Sessions under {} (newest first)", output.display());
    println!("{}", "=".repeat(40));
    for entry in entries {
        let modified: DateTime<Local> = entry.modified.into();
        println!(
            "{}  {}",
            modified.format("%Y-%m-%d %H:%M:%S"),
            entry.path.display()
        );
    }

    Ok(())
}

fn clean_sessions(output: PathBuf, keep: usize) -> Result<()> {
    let manager = SessionManager::new(output);
    let sweep = manager.enforce_retention(keep)?;

    for path in &sweep.deleted {
        println!("[✓] Deleted old session: {}", path.display());
    }
    for (path, err) in &sweep.failed {
        eprintln!("[!] Could not delete {}: {err}", path.display());
    }
    println!(
        "[*] Retention sweep: {} deleted, {} failed, keeping {}",
        sweep.deleted.len(),
        sweep.failed.len(),
        keep
    );

    Ok(())
}

fn show_info(input: PathBuf) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let pdf = PdfPages::new(input.clone())
        .with_context(|| format!("Failed to open PDF: {}", input.display()))?;
    let page_count = pdf.page_count()?;

    println!("PDF Information");
    println!("===============");
    println!("File: {}", input.display());
    println!("Pages: {page_count}");

    Ok(())
}
