//! Request and response types exchanged with the inference service.

use serde::{Deserialize, Serialize};

/// Decoding options sent with every request.
///
/// Serialized field names match the generate endpoint's `options` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodingOptions {
    /// Sampling temperature. Kept low so the reply format does not drift.
    pub temperature: f32,

    /// Maximum number of generated tokens.
    pub num_predict: u32,

    /// Generation halts at the first of these sequences.
    pub stop: Vec<String>,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            num_predict: 1500,
            stop: vec!["}".to_string()],
        }
    }
}

/// One prompt for one document. Built once, discarded after the call.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Model identifier understood by the service.
    pub model: String,

    /// Full prompt text.
    pub prompt: String,

    /// Optional raster page (PNG bytes). Encoded as base64 on the wire.
    pub image: Option<Vec<u8>>,

    /// Decoding options.
    pub options: DecodingOptions,
}

impl InferenceRequest {
    /// Create a text-only request with default decoding options.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            image: None,
            options: DecodingOptions::default(),
        }
    }

    /// Attach a PNG page image.
    pub fn with_image(mut self, png: Vec<u8>) -> Self {
        self.image = Some(png);
        self
    }

    /// Replace the decoding options.
    pub fn with_options(mut self, options: DecodingOptions) -> Self {
        self.options = options;
        self
    }
}

/// Raw reply from the service, consumed only by response recovery.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    /// Generated text, untouched.
    pub text: String,

    /// Wall-clock duration of the call in milliseconds.
    pub elapsed_ms: u64,
}
