//! Inference backend implementations.

#[cfg(feature = "http")]
pub mod http;

pub mod replay;

use std::time::Duration;

use crate::{InferenceRequest, InferenceResponse, Result};

/// Trait for generative-model backends.
///
/// A backend takes one request and returns the service's raw text. It
/// keeps no per-request state, so one instance can be shared by several
/// callers against the same endpoint.
pub trait InferenceBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Send the request and block until the reply arrives or `timeout` elapses.
    ///
    /// # Arguments
    /// * `request` - Prompt, optional image and decoding options
    /// * `timeout` - Upper bound for the whole call, including the body
    ///
    /// # Returns
    /// The reply text exactly as generated. Nothing is kept on failure.
    fn generate(&self, request: &InferenceRequest, timeout: Duration) -> Result<InferenceResponse>;
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, request: &InferenceRequest, timeout: Duration) -> Result<InferenceResponse> {
        (**self).generate(request, timeout)
    }
}
