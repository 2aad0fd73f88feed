//! Batch processing command for a folder of PDFs.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use docfield_core::pipeline::list_documents;
use docfield_core::{BatchReport, DocumentOutcome, Pipeline, ProfileKind};

use super::{http_backend, load_config, millis};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input folder (default: paths.input_dir from config)
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Output folder (default: paths.output_dir from config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Extraction profile (payroll-vision, payroll-text, invoice-text)
    #[arg(short, long)]
    profile: Option<ProfileKind>,

    /// Also generate a summary CSV in the output folder
    #[arg(long)]
    summary: bool,

    /// Stop at the first failed document
    #[arg(long)]
    fail_fast: bool,
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = args.input_dir {
        config.paths.input_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.paths.output_dir = dir;
    }

    let input_dir = config.paths.input_dir.clone();
    let documents = list_documents(&input_dir)
        .map_err(|e| anyhow::anyhow!("Cannot read input folder {}: {}", input_dir.display(), e))?;

    if documents.is_empty() {
        anyhow::bail!("No PDF files found in {}", input_dir.display());
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        documents.len()
    );

    let profile = config.profile_for(args.profile.unwrap_or(config.extraction.profile));
    let sink = config.sink();
    let pipeline = Pipeline::new(http_backend(&config)?, profile);

    let overall_pb = ProgressBar::new(documents.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let report = pipeline.run_documents(&documents, &sink, args.fail_fast, |document| {
        let name = file_name(&document.source);
        if !document.is_success() {
            overall_pb.println(format!("{} {}", style("✗").red(), name));
        }
        overall_pb.set_message(name);
        overall_pb.inc(1);
    });

    overall_pb.finish_with_message("Complete");

    for collision in &report.collisions {
        println!(
            "{} {} sources share the output {}",
            style("!").yellow(),
            collision.sources.len(),
            collision.output.display()
        );
    }

    // Generate summary if requested
    if args.summary {
        let summary_path = sink.output_dir().join("summary.csv");
        write_summary(&summary_path, &report)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    print_summary(&report);

    if args.fail_fast && report.failed() > 0 {
        anyhow::bail!("Stopped after a failed document");
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_summary(report: &BatchReport) {
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        report.documents.len(),
        report.elapsed
    );
    println!(
        "   {} successful, {} failed",
        style(report.succeeded()).green(),
        style(report.failed()).red()
    );

    let failed: Vec<_> = report.documents.iter().filter(|d| !d.is_success()).collect();
    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for document in failed {
            let cause = document
                .outcome
                .error()
                .map(|e| e.cause.as_str())
                .unwrap_or("unknown error");
            println!("  - {}: {}", document.source.display(), cause);
        }
    }
}

fn write_summary(path: &Path, report: &BatchReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    let processed_at = chrono::Local::now().to_rfc3339();

    wtr.write_record([
        "filename",
        "status",
        "output",
        "fields",
        "filled",
        "issues",
        "processing_time_ms",
        "processed_at",
        "error",
    ])?;

    for document in &report.documents {
        let filename = file_name(&document.source);
        let output = document
            .output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let elapsed = millis(document.elapsed).to_string();

        match &document.outcome {
            DocumentOutcome::Extracted(record) => {
                wtr.write_record([
                    filename.as_str(),
                    "success",
                    &output,
                    &record.len().to_string(),
                    &record.filled_count().to_string(),
                    &document.issues.len().to_string(),
                    &elapsed,
                    &processed_at,
                    "",
                ])?;
            }
            DocumentOutcome::Failed(error) => {
                wtr.write_record([
                    filename.as_str(),
                    "error",
                    &output,
                    "",
                    "",
                    "",
                    &elapsed,
                    &processed_at,
                    &error.cause,
                ])?;
            }
        }
    }

    wtr.flush()?;
    if report.documents.iter().any(|d| d.output.is_none()) {
        warn!("Some results could not be written; see the log above");
    }
    Ok(())
}
