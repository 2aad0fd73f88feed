//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::intake::Intake;
use crate::pipeline::{PipelineProfile, ProfileKind};
use crate::sink::ResultSink;

/// Main configuration for a docfield run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocfieldConfig {
    /// Input and output folders.
    pub paths: PathsConfig,

    /// Inference service settings.
    pub inference: InferenceConfig,

    /// Extraction profile and its overrides.
    pub extraction: ExtractionConfig,
}

/// Folder configuration. Scoped to one run, passed explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where uploaded/batch source documents live.
    pub input_dir: PathBuf,

    /// Where records are written.
    pub output_dir: PathBuf,

    /// Appended to the source stem to name the output file.
    pub output_suffix: String,

    /// Also write the raw model reply next to each record.
    pub keep_raw_responses: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("entrada"),
            output_dir: PathBuf::from("saida"),
            output_suffix: "_extraido".to_string(),
            keep_raw_responses: false,
        }
    }
}

/// Inference endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Generate endpoint URL.
    pub endpoint: String,

    /// Connect timeout in seconds. The per-call timeout comes from the profile.
    pub connect_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: docfield_inference::DEFAULT_ENDPOINT.to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// Profile selection and optional overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Built-in profile to start from.
    pub profile: ProfileKind,

    /// Model identifier override.
    pub model: Option<String>,

    /// Per-call timeout override in seconds.
    pub timeout_secs: Option<u64>,

    /// Temperature override.
    pub temperature: Option<f32>,

    /// Generation length cap override.
    pub max_output_tokens: Option<u32>,
}

impl DocfieldConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Resolve the configured profile with overrides applied.
    pub fn profile(&self) -> PipelineProfile {
        self.profile_for(self.extraction.profile)
    }

    /// Resolve a specific built-in profile with this config's overrides.
    pub fn profile_for(&self, kind: ProfileKind) -> PipelineProfile {
        let mut profile = PipelineProfile::builtin(kind);
        let overrides = &self.extraction;

        if let Some(model) = &overrides.model {
            profile.model = model.clone();
        }
        if let Some(secs) = overrides.timeout_secs {
            profile.timeout = Duration::from_secs(secs);
        }
        if let Some(temperature) = overrides.temperature {
            profile.decoding.temperature = temperature;
        }
        if let Some(max_tokens) = overrides.max_output_tokens {
            profile.decoding.num_predict = max_tokens;
        }

        profile
    }

    /// Result sink writing into the configured output folder.
    pub fn sink(&self) -> ResultSink {
        ResultSink::new(&self.paths.output_dir, &self.paths.output_suffix)
            .with_raw_responses(self.paths.keep_raw_responses)
    }

    /// Upload intake storing into the configured input folder.
    pub fn intake(&self) -> Intake {
        Intake::new(&self.paths.input_dir)
    }

    /// Connect timeout for the HTTP backend.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.inference.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = DocfieldConfig::default();
        assert_eq!(config.paths.input_dir, PathBuf::from("entrada"));
        assert_eq!(config.paths.output_dir, PathBuf::from("saida"));
        assert_eq!(config.inference.endpoint, "http://localhost:11434/api/generate");
        assert_eq!(config.extraction.profile, ProfileKind::PayrollVision);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: DocfieldConfig =
            serde_json::from_str(r#"{"extraction": {"profile": "invoice-text", "model": "llama3"}}"#).unwrap();

        let profile = config.profile();
        assert_eq!(profile.kind, ProfileKind::InvoiceText);
        assert_eq!(profile.model, "llama3");
        assert_eq!(profile.timeout, Duration::from_secs(300));
        assert_eq!(config.paths.output_suffix, "_extraido");
    }

    #[test]
    fn test_overrides_apply_to_decoding() {
        let mut config = DocfieldConfig::default();
        config.extraction.temperature = Some(0.0);
        config.extraction.max_output_tokens = Some(42);
        config.extraction.timeout_secs = Some(5);

        let profile = config.profile();
        assert_eq!(profile.decoding.temperature, 0.0);
        assert_eq!(profile.decoding.num_predict, 42);
        assert_eq!(profile.decoding.stop, vec!["}".to_string()]);
        assert_eq!(profile.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = DocfieldConfig::default();
        config.paths.keep_raw_responses = true;

        config.save(&path).unwrap();
        let loaded = DocfieldConfig::from_file(&path).unwrap();
        assert!(loaded.paths.keep_raw_responses);
    }
}
