//! Error types for the inference layer.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while calling the inference service.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The service answered with a non-200 status.
    #[error("inference service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The call did not complete within the caller's timeout.
    #[error("inference call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The request never produced a response (connection refused, reset, DNS).
    #[error("inference transport failed: {0}")]
    Transport(String),

    /// A 200 response whose body is not a generate reply.
    #[error("invalid inference response: {0}")]
    InvalidResponse(String),

    /// I/O error when loading a captured reply.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InferenceError {
    /// True for the timeout/transport class, where no response exists at all.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transport(_))
    }

    /// Response body or status detail kept for operator debugging.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            Self::InvalidResponse(detail) => Some(detail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_carries_code_and_body() {
        let err = InferenceError::Status {
            status: 500,
            body: "model not loaded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "inference service returned HTTP 500: model not loaded"
        );
        assert!(!err.is_timeout());
        assert_eq!(err.diagnostic(), Some("model not loaded"));
    }

    #[test]
    fn test_transport_counts_as_timeout_class() {
        assert!(InferenceError::Timeout(Duration::from_secs(5)).is_timeout());
        assert!(InferenceError::Transport("connection refused".into()).is_timeout());
    }
}
