//! Replay backend answering from a previously captured reply.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::request::{InferenceRequest, InferenceResponse};
use crate::{InferenceBackend, Result};

/// Backend that never touches the network.
///
/// Every request gets the same captured text back. Used to re-run
/// recovery on a saved reply and to drive the pipeline in tests.
pub struct ReplayBackend {
    text: String,
}

impl ReplayBackend {
    /// Replay the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Replay the contents of a captured reply file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading captured reply from: {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(text))
    }
}

impl InferenceBackend for ReplayBackend {
    fn name(&self) -> &str {
        "replay"
    }

    fn generate(&self, request: &InferenceRequest, _timeout: Duration) -> Result<InferenceResponse> {
        debug!(model = %request.model, "Replaying {} captured chars", self.text.len());
        Ok(InferenceResponse {
            text: self.text.clone(),
            elapsed_ms: 0,
        })
    }
}
