//! Result persistence: one pretty JSON file per source document.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{DocfieldError, Result};
use crate::models::record::DocumentOutcome;

/// Suffix of the raw reply file written next to a record.
pub const RAW_RESPONSE_SUFFIX: &str = "_resposta";

/// Writes records into an output folder under derived names.
#[derive(Debug, Clone)]
pub struct ResultSink {
    output_dir: PathBuf,
    suffix: String,
    keep_raw: bool,
}

impl ResultSink {
    pub fn new(output_dir: impl Into<PathBuf>, suffix: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            suffix: suffix.to_string(),
            keep_raw: false,
        }
    }

    /// Also keep each raw model reply as a text file.
    pub fn with_raw_responses(mut self, keep: bool) -> Self {
        self.keep_raw = keep;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn keeps_raw_responses(&self) -> bool {
        self.keep_raw
    }

    fn stem(source: &Path) -> String {
        source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "documento".to_string())
    }

    /// `<output_dir>/<source stem><suffix>.json`
    pub fn output_path(&self, source: &Path) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.json", Self::stem(source), self.suffix))
    }

    /// `<output_dir>/<source stem>_resposta.txt`
    pub fn raw_path(&self, source: &Path) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.txt", Self::stem(source), RAW_RESPONSE_SUFFIX))
    }

    /// Write a record or error record, replacing any existing file.
    pub fn write(&self, source: &Path, outcome: &DocumentOutcome) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_path(source);
        let json = serde_json::to_string_pretty(outcome)
            .map_err(|e| DocfieldError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::write(&path, json)?;

        info!("Saved result to {}", path.display());
        Ok(path)
    }

    /// Write the raw model reply if raw replies are kept.
    pub fn write_raw(&self, source: &Path, raw: &str) -> Result<Option<PathBuf>> {
        if !self.keep_raw {
            return Ok(None);
        }
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.raw_path(source);
        std::fs::write(&path, raw)?;
        debug!("Saved raw reply to {}", path.display());
        Ok(Some(path))
    }
}
