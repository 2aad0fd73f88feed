//! The extraction pipeline: preprocess, prompt, infer, recover, persist.
//!
//! One generic pipeline serves every document class; a [`PipelineProfile`]
//! selects the content kind, schema, key policy and model. Documents are
//! processed one at a time and nothing is carried between them.

mod profile;

pub use profile::{INVOICE_KEYWORDS, PipelineProfile, ProfileKind};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use docfield_inference::{InferenceBackend, InferenceRequest, InferenceResponse};
use tracing::{debug, info, warn};

use crate::error::{DocfieldError, Result};
use crate::intake::is_allowed;
use crate::models::record::{DocumentOutcome, ExtractedRecord};
use crate::pdf::{self, DocumentContent};
use crate::prompt::PromptBuilder;
use crate::recovery::RecoveryEngine;
use crate::sink::ResultSink;

/// A recovered record together with the reply it came from.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: ExtractedRecord,
    pub raw: String,
    pub elapsed_ms: u64,
}

/// What happened to one document.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub outcome: DocumentOutcome,
    /// Where the outcome was written, if writing succeeded.
    pub output: Option<PathBuf>,
    /// Advisory validation issues. Empty for failed documents.
    pub issues: Vec<String>,
    pub elapsed: Duration,
}

impl DocumentReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Two or more sources that derive the same output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCollision {
    pub output: PathBuf,
    pub sources: Vec<PathBuf>,
}

/// Result of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
    pub collisions: Vec<OutputCollision>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.documents.iter().filter(|d| d.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.documents.len() - self.succeeded()
    }
}

/// PDFs in `dir` (extension matched case-insensitively), sorted by name.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut documents: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| path.file_name().is_some_and(|n| is_allowed(&n.to_string_lossy())))
        .collect();
    documents.sort();
    Ok(documents)
}

/// Groups of sources mapping to the same output path.
pub fn find_collisions(sources: &[PathBuf], sink: &ResultSink) -> Vec<OutputCollision> {
    let mut by_output: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for source in sources {
        by_output
            .entry(sink.output_path(source))
            .or_default()
            .push(source.clone());
    }
    by_output
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(|(output, sources)| OutputCollision { output, sources })
        .collect()
}

/// Generic extraction pipeline over an inference backend.
pub struct Pipeline<B: InferenceBackend> {
    backend: B,
    profile: PipelineProfile,
    prompt: PromptBuilder,
    recovery: RecoveryEngine,
}

impl<B: InferenceBackend> Pipeline<B> {
    pub fn new(backend: B, profile: PipelineProfile) -> Self {
        let prompt = PromptBuilder::new(profile.schema.clone()).with_line_filter(profile.line_filter.clone());
        let recovery = RecoveryEngine::new(profile.key_policy);
        Self {
            backend,
            profile,
            prompt,
            recovery,
        }
    }

    pub fn profile(&self) -> &PipelineProfile {
        &self.profile
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Preprocess a document and build its request, without calling the service.
    pub fn prepare(&self, path: &Path) -> Result<(DocumentContent, InferenceRequest)> {
        let content = pdf::preprocess(path, self.profile.content_kind)?;
        let request = self
            .prompt
            .build(&content, &self.profile.model, &self.profile.decoding);
        debug!(
            "Built {} request for {}: {} prompt chars, image: {}",
            self.profile.kind,
            path.display(),
            request.prompt.len(),
            request.image.as_ref().map_or(0, Vec::len)
        );
        Ok((content, request))
    }

    fn infer(&self, path: &Path) -> Result<InferenceResponse> {
        let (_, request) = self.prepare(path)?;
        info!(
            "Calling {} backend with model {} (timeout {}s)",
            self.backend.name(),
            request.model,
            self.profile.timeout.as_secs()
        );
        let response = self.backend.generate(&request, self.profile.timeout)?;
        debug!("Reply: {} chars in {} ms", response.text.len(), response.elapsed_ms);
        Ok(response)
    }

    /// Run every stage but persistence for one document.
    pub fn extract(&self, path: &Path) -> Result<Extraction> {
        let response = self.infer(path)?;
        let record = self.recovery.recover(&response.text)?;
        Ok(Extraction {
            record,
            raw: response.text,
            elapsed_ms: response.elapsed_ms,
        })
    }

    /// Recover a record from an already captured reply.
    pub fn recover(&self, raw: &str) -> Result<ExtractedRecord> {
        Ok(self.recovery.recover(raw)?)
    }

    /// Process one document and write its record or error record.
    ///
    /// Never fails: every error ends up in the report's outcome.
    pub fn process(&self, path: &Path, sink: &ResultSink) -> DocumentReport {
        let start = Instant::now();
        info!("Processing {}", path.display());

        let result = self.infer(path).and_then(|response| {
            if let Err(e) = sink.write_raw(path, &response.text) {
                warn!("Could not save raw reply for {}: {}", path.display(), e);
            }
            self.recovery
                .recover(&response.text)
                .map_err(DocfieldError::from)
        });

        let outcome = DocumentOutcome::from(result);
        let issues = match &outcome {
            DocumentOutcome::Extracted(record) => {
                info!("Recovered {} fields from {}", record.len(), path.display());
                record.validate(&self.profile.schema, self.profile.key_policy)
            }
            DocumentOutcome::Failed(error) => {
                warn!("{}: {}", path.display(), error.cause);
                if let Some(detail) = &error.diagnostic {
                    debug!("Diagnostic for {}: {}", path.display(), detail);
                }
                Vec::new()
            }
        };
        for issue in &issues {
            debug!("{}: {}", path.display(), issue);
        }

        let output = match sink.write(path, &outcome) {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("Could not write result for {}: {}", path.display(), e);
                None
            }
        };

        DocumentReport {
            source: path.to_path_buf(),
            outcome,
            output,
            issues,
            elapsed: start.elapsed(),
        }
    }

    /// Process every PDF in `input_dir`, in name order, one at a time.
    ///
    /// A failed document still gets its error record; later documents are
    /// processed unless `fail_fast` is set.
    pub fn run_batch(&self, input_dir: &Path, sink: &ResultSink, fail_fast: bool) -> Result<BatchReport> {
        let documents = list_documents(input_dir)?;
        info!("Found {} documents in {}", documents.len(), input_dir.display());
        Ok(self.run_documents(&documents, sink, fail_fast, |_| {}))
    }

    /// Process the given documents in order, calling `on_done` after each.
    pub fn run_documents<F>(&self, documents: &[PathBuf], sink: &ResultSink, fail_fast: bool, mut on_done: F) -> BatchReport
    where
        F: FnMut(&DocumentReport),
    {
        let start = Instant::now();
        let collisions = find_collisions(documents, sink);
        for collision in &collisions {
            warn!(
                "{} sources write to {}; only the last one processed will remain",
                collision.sources.len(),
                collision.output.display()
            );
        }

        let mut report = BatchReport {
            collisions,
            ..BatchReport::default()
        };
        for path in documents {
            let document = self.process(path, sink);
            on_done(&document);
            let stop = fail_fast && !document.is_success();
            report.documents.push(document);
            if stop {
                warn!("Stopping batch after failure on {}", path.display());
                break;
            }
        }

        report.elapsed = start.elapsed();
        info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }
}
