//! Process command - extract fields from a single PDF.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{debug, info};

use docfield_core::intake::is_allowed;
use docfield_core::pdf::DocumentContent;
use docfield_core::{
    DocumentOutcome, ErrorRecord, InferenceBackend, Pipeline, ProfileKind, ReplayBackend,
};

use super::{http_backend, load_config, millis};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Extraction profile (payroll-vision, payroll-text, invoice-text)
    #[arg(short, long)]
    profile: Option<ProfileKind>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Copy the PDF into the input folder before processing
    #[arg(long)]
    import: bool,

    /// Use a saved model reply instead of calling the service
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Print the prompt without calling the service
    #[arg(long)]
    dry_run: bool,

    /// Validate extracted data
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !is_allowed(&name) {
        return reject(ErrorRecord::new(docfield_core::intake::INVALID_UPLOAD));
    }

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let input = if args.import {
        match config.intake().import(&args.input) {
            Ok(stored) => {
                info!("Imported {} as {}", args.input.display(), stored.display());
                stored
            }
            Err(record) => return reject(record),
        }
    } else {
        args.input.clone()
    };

    let profile = config.profile_for(args.profile.unwrap_or(config.extraction.profile));
    info!("Processing file: {} with profile {}", input.display(), profile.kind);

    let backend: Box<dyn InferenceBackend> = match &args.replay {
        Some(path) => Box::new(ReplayBackend::from_file(path)?),
        None => Box::new(http_backend(&config)?),
    };
    let pipeline = Pipeline::new(backend, profile);

    if args.dry_run {
        return dry_run(&pipeline, &input);
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!(
        "Extracting fields with {} via {}...",
        pipeline.profile().model,
        pipeline.backend().name()
    ));

    let report = pipeline.process(&input, &config.sink());
    pb.finish_and_clear();

    if args.validate && !report.issues.is_empty() {
        eprintln!("{}", style("Validation issues:").yellow());
        for issue in &report.issues {
            eprintln!("  - {}", issue);
        }
    }

    let output = format_outcome(&report.outcome, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if let Some(saved) = &report.output {
        eprintln!("{} Saved {}", style("ℹ").blue(), saved.display());
    }
    debug!("Total processing time: {}ms", millis(start.elapsed()));

    match &report.outcome {
        DocumentOutcome::Extracted(_) => Ok(()),
        DocumentOutcome::Failed(_) => anyhow::bail!("Extraction failed for {}", input.display()),
    }
}

/// Print the error record and exit non-zero.
fn reject(record: ErrorRecord) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&record)?);
    anyhow::bail!("{}", record.cause)
}

fn dry_run<B: InferenceBackend>(pipeline: &Pipeline<B>, input: &std::path::Path) -> anyhow::Result<()> {
    let (content, request) = pipeline.prepare(input)?;

    println!("{} {}", style("Model:").bold(), request.model);
    println!(
        "{} temperature={} num_predict={} stop={:?}",
        style("Options:").bold(),
        request.options.temperature,
        request.options.num_predict,
        request.options.stop
    );
    if let DocumentContent::Image(page) = &content {
        println!(
            "{} {}x{} PNG, {} bytes",
            style("Image:").bold(),
            page.width,
            page.height,
            page.png.len()
        );
    }
    println!();
    println!("{}", request.prompt);
    Ok(())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn format_outcome(outcome: &DocumentOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => format_csv(outcome),
        OutputFormat::Text => Ok(format_text(outcome)),
    }
}

fn format_csv(outcome: &DocumentOutcome) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    match outcome {
        DocumentOutcome::Extracted(record) => {
            wtr.write_record(record.iter().map(|(key, _)| key.as_str()))?;
            wtr.write_record(record.iter().map(|(_, value)| value_text(value)))?;
        }
        DocumentOutcome::Failed(error) => {
            wtr.write_record([docfield_core::models::ERROR_KEY])?;
            wtr.write_record([error.cause.as_str()])?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(outcome: &DocumentOutcome) -> String {
    match outcome {
        DocumentOutcome::Extracted(record) => {
            let width = record.iter().map(|(key, _)| key.chars().count()).max().unwrap_or(0);
            record
                .iter()
                .map(|(key, value)| {
                    format!("{:width$}  {}", key, value_text(value), width = width)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        DocumentOutcome::Failed(error) => {
            format!("{}: {}", docfield_core::models::ERROR_KEY, error.cause)
        }
    }
}
