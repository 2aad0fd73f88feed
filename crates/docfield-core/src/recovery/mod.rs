//! Recovery of a key/value record from a free-form model reply.
//!
//! The reply is untrusted: it may carry a preamble, trailing prose, several
//! objects, or be cut off at the stop sequence before its closing brace.
//! Recovery runs in four steps:
//!
//! 1. Truncation repair: append one `}` if the trimmed reply lacks it.
//! 2. Candidate scanning (see [`scanner`]).
//! 3. Ordered parse attempts: the first candidate that parses as a JSON
//!    object wins, later ones are ignored.
//! 4. Key normalization according to the [`KeyPolicy`].
//!
//! If no candidate parses the result is a [`RecoveryError`] holding the full
//! reply. There is no partial or best-guess record.

pub mod normalize;
pub mod scanner;

use std::borrow::Cow;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::RecoveryError;
use crate::models::record::ExtractedRecord;
use crate::models::schema::KeyPolicy;

pub use normalize::canonical_key;
pub use scanner::candidates;

/// Append a closing brace if the reply, trimmed of trailing whitespace,
/// does not end with one.
///
/// Only a single character is ever added. Applying the repair twice gives
/// the same text as applying it once.
pub fn repair_truncation(text: &str) -> Cow<'_, str> {
    let trimmed = text.trim_end();
    if trimmed.ends_with('}') {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("{}}}", trimmed))
    }
}

/// Parse one candidate block as a JSON object.
///
/// Raw line breaks are removed first: models often wrap long string
/// values, which is not valid JSON.
fn parse_candidate(candidate: &str) -> Option<Map<String, Value>> {
    let parsed = if candidate.contains(['\r', '\n']) {
        let joined: String = candidate.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        serde_json::from_str::<Map<String, Value>>(&joined)
    } else {
        serde_json::from_str::<Map<String, Value>>(candidate)
    };

    match parsed {
        Ok(map) => Some(map),
        Err(e) => {
            trace!("Candidate rejected: {}", e);
            None
        }
    }
}

/// Turns raw model replies into records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryEngine {
    key_policy: KeyPolicy,
}

impl RecoveryEngine {
    pub fn new(key_policy: KeyPolicy) -> Self {
        Self { key_policy }
    }

    pub fn key_policy(&self) -> KeyPolicy {
        self.key_policy
    }

    /// Recover a record from a raw reply.
    pub fn recover(&self, raw: &str) -> Result<ExtractedRecord, RecoveryError> {
        let repaired = repair_truncation(raw);

        let mut tried = 0;
        for candidate in candidates(&repaired) {
            tried += 1;
            if let Some(map) = parse_candidate(candidate) {
                debug!("Recovered record from candidate {} ({} keys)", tried, map.len());
                return Ok(self.normalize(map));
            }
        }

        debug!("No parseable candidate among {}", tried);
        Err(RecoveryError {
            raw: raw.to_string(),
            candidates: tried,
        })
    }

    /// Apply the key policy. Values are left untouched; when two keys fold
    /// to the same canonical form the later value wins.
    fn normalize(&self, map: Map<String, Value>) -> ExtractedRecord {
        match self.key_policy {
            KeyPolicy::Verbatim => ExtractedRecord::new(map),
            KeyPolicy::Canonical => ExtractedRecord::new(
                map.into_iter()
                    .map(|(key, value)| (canonical_key(&key), value))
                    .collect(),
            ),
        }
    }
}

/// Recover a record with the given key policy.
pub fn recover(raw: &str, key_policy: KeyPolicy) -> Result<ExtractedRecord, RecoveryError> {
    RecoveryEngine::new(key_policy).recover(raw)
}
