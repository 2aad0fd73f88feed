//! Core library for model-assisted field extraction from PDF documents.
//!
//! This crate provides:
//! - PDF preprocessing (page image or page text with detected tables)
//! - Prompt construction from a fixed field schema
//! - Recovery of a record from a possibly truncated model reply
//! - Result persistence and upload intake
//! - A generic pipeline parameterized by profile

pub mod error;
pub mod intake;
pub mod models;
pub mod patterns;
pub mod pdf;
pub mod pipeline;
pub mod prompt;
pub mod recovery;
pub mod sink;

pub use error::{DocfieldError, DocumentError, ErrorKind, RecoveryError, Result};
pub use intake::Intake;
pub use models::{DocfieldConfig, DocumentOutcome, ErrorRecord, ExtractedRecord, ExtractionSchema, KeyPolicy};
pub use pdf::{ContentKind, DocumentContent, PdfExtractor, PdfProcessor};
pub use pipeline::{BatchReport, DocumentReport, Pipeline, PipelineProfile, ProfileKind};
pub use prompt::PromptBuilder;
pub use recovery::{RecoveryEngine, recover};
pub use sink::ResultSink;

/// Re-export inference types.
pub use docfield_inference::{
    DecodingOptions, InferenceBackend, InferenceError, InferenceRequest, InferenceResponse, ReplayBackend,
};

#[cfg(feature = "http")]
pub use docfield_inference::HttpBackend;
