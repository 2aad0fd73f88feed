//! Inference client layer for docfield.
//!
//! This crate sends extraction prompts to a generative-model service and
//! hands back the raw textual reply. Two backends share one interface:
//! - `HttpBackend` for a single HTTP generate endpoint (Ollama-compatible)
//! - `ReplayBackend` for answering from a previously captured reply
//!
//! No backend retries. Retry policy belongs to the caller.

mod backend;
mod error;
mod request;

pub use backend::InferenceBackend;
pub use backend::replay::ReplayBackend;
pub use error::InferenceError;
pub use request::{DecodingOptions, InferenceRequest, InferenceResponse};

#[cfg(feature = "http")]
pub use backend::http::HttpBackend;

/// Default local generate endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
