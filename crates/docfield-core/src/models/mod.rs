//! Data models: extraction schemas, records, and configuration.

pub mod config;
pub mod record;
pub mod schema;

pub use config::DocfieldConfig;
pub use record::{DocumentOutcome, ERROR_KEY, ErrorRecord, ExtractedRecord};
pub use schema::{ExtractionSchema, FieldKind, FieldSpec, KeyPolicy};
