//! Error types for the docfield-core library.

use thiserror::Error;

/// Main error type for the docfield library.
#[derive(Error, Debug)]
pub enum DocfieldError {
    /// Source document could not be turned into prompt content.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Inference call failed.
    #[error("inference error: {0}")]
    Inference(#[from] docfield_inference::InferenceError),

    /// No structured block could be recovered from the model reply.
    #[error("recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse error category, one per terminal failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Document,
    Inference,
    InferenceTimeout,
    Recovery,
    Io,
    Config,
}

impl DocfieldError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Document(_) => ErrorKind::Document,
            Self::Inference(e) if e.is_timeout() => ErrorKind::InferenceTimeout,
            Self::Inference(_) => ErrorKind::Inference,
            Self::Recovery(_) => ErrorKind::Recovery,
            Self::Io(_) => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Raw reply or HTTP body kept for operator debugging.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Inference(e) => e.diagnostic(),
            Self::Recovery(e) => Some(&e.raw),
            _ => None,
        }
    }
}

/// Errors related to reading the source document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("failed to read document: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Requested page does not exist.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// Failed to extract text from the first page.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The first page could not be rendered to an image.
    #[error("failed to render page: {0}")]
    Render(String),

    /// PNG encoding failed.
    #[error("failed to encode page image: {0}")]
    Encode(#[from] image::ImageError),
}

/// No candidate block in the reply parsed as a key/value record.
#[derive(Error, Debug)]
#[error("no parseable JSON object in model reply ({candidates} candidate blocks, {} chars)", .raw.len())]
pub struct RecoveryError {
    /// The full reply as received, before repair.
    pub raw: String,
    /// Number of candidate blocks that were tried.
    pub candidates: usize,
}

/// Result type for the docfield library.
pub type Result<T> = std::result::Result<T, DocfieldError>;

#[cfg(test)]
mod tests {
    use super::*;
    use docfield_inference::InferenceError;
    use std::time::Duration;

    #[test]
    fn test_error_kinds() {
        let status: DocfieldError = InferenceError::Status {
            status: 503,
            body: "busy".into(),
        }
        .into();
        assert_eq!(status.kind(), ErrorKind::Inference);
        assert_eq!(status.diagnostic(), Some("busy"));

        let timeout: DocfieldError = InferenceError::Timeout(Duration::from_secs(300)).into();
        assert_eq!(timeout.kind(), ErrorKind::InferenceTimeout);

        let recovery: DocfieldError = RecoveryError {
            raw: "no json here".into(),
            candidates: 0,
        }
        .into();
        assert_eq!(recovery.kind(), ErrorKind::Recovery);
        assert_eq!(recovery.diagnostic(), Some("no json here"));

        let document: DocfieldError = DocumentError::NoPages.into();
        assert_eq!(document.kind(), ErrorKind::Document);
        assert_eq!(document.diagnostic(), None);
    }
}
