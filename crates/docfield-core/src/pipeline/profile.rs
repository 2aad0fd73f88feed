//! Pipeline profiles: content kind, schema, key policy and model settings.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use docfield_inference::DecodingOptions;
use serde::{Deserialize, Serialize};

use crate::models::schema::{ExtractionSchema, KeyPolicy};
use crate::pdf::ContentKind;

/// Keywords kept by the invoice line filter.
pub const INVOICE_KEYWORDS: &[&str] = &[
    "TOTAL",
    "ISS",
    "INSS",
    "PIS",
    "COFINS",
    "CSLL",
    "IRRF",
    "VALOR",
    "BASE DE CÁLCULO",
    "DEDUÇÃO",
    "DESCONTO",
    "QTD.",
    "ALIQUOTA",
];

/// Built-in profile identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileKind {
    /// Payroll statement read from the page image by a vision model.
    #[default]
    PayrollVision,
    /// Payroll statement read from extracted text and tables.
    PayrollText,
    /// Service invoice read from filtered text.
    InvoiceText,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 3] = [Self::PayrollVision, Self::PayrollText, Self::InvoiceText];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PayrollVision => "payroll-vision",
            Self::PayrollText => "payroll-text",
            Self::InvoiceText => "invoice-text",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown profile '{}' (expected one of: {})",
                    s,
                    Self::ALL.map(|k| k.as_str()).join(", ")
                )
            })
    }
}

/// Everything that varies between pipeline variants.
#[derive(Debug, Clone)]
pub struct PipelineProfile {
    pub kind: ProfileKind,
    pub content_kind: ContentKind,
    pub schema: ExtractionSchema,
    pub key_policy: KeyPolicy,
    pub model: String,
    /// Per-call inference timeout.
    pub timeout: Duration,
    pub decoding: DecodingOptions,
    /// Header lines kept before prompting, if set.
    pub line_filter: Option<Vec<String>>,
}

impl PipelineProfile {
    /// Built-in settings for a profile.
    pub fn builtin(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::PayrollVision => Self {
                kind,
                content_kind: ContentKind::Image,
                schema: ExtractionSchema::payroll(),
                key_policy: KeyPolicy::Verbatim,
                model: "llava:13b".to_string(),
                timeout: Duration::from_secs(1800),
                decoding: DecodingOptions::default(),
                line_filter: None,
            },
            ProfileKind::PayrollText => Self {
                kind,
                content_kind: ContentKind::StructuredText,
                schema: ExtractionSchema::payroll(),
                key_policy: KeyPolicy::Verbatim,
                model: "mistral".to_string(),
                timeout: Duration::from_secs(600),
                decoding: DecodingOptions::default(),
                line_filter: None,
            },
            ProfileKind::InvoiceText => Self {
                kind,
                content_kind: ContentKind::StructuredText,
                schema: ExtractionSchema::invoice(),
                key_policy: KeyPolicy::Canonical,
                model: "mistral".to_string(),
                timeout: Duration::from_secs(300),
                decoding: DecodingOptions {
                    num_predict: 800,
                    ..DecodingOptions::default()
                },
                line_filter: Some(INVOICE_KEYWORDS.iter().map(|k| k.to_string()).collect()),
            },
        }
    }
}
