//! Extracted records, error records, and advisory validation.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::DocfieldError;
use crate::models::schema::{ExtractionSchema, KeyPolicy};
use crate::patterns::PLAIN_AMOUNT;

/// Reserved key under which an error record carries its cause.
pub const ERROR_KEY: &str = "Erro";

/// Field name to value, in the order the model emitted them.
///
/// Values are kept as parsed: empty strings stay, unexpected keys stay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedRecord(Map<String, Value>);

impl ExtractedRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of a field, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Number of fields holding something other than an empty string or null.
    pub fn filled_count(&self) -> usize {
        self.0
            .values()
            .filter(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            })
            .count()
    }

    /// Check the record against its schema.
    ///
    /// Returns human-readable issues. The record itself is never changed:
    /// missing and extra fields are reported, not fixed.
    pub fn validate(&self, schema: &ExtractionSchema, policy: KeyPolicy) -> Vec<String> {
        let mut issues = Vec::new();

        for key in schema.keys() {
            let key = policy.apply(&key);
            if !self.0.contains_key(&key) {
                issues.push(format!("Missing field {}", key));
            }
        }

        for (key, value) in &self.0 {
            if !value.is_string() {
                issues.push(format!("Field {} is not a string: {}", key, value));
            }
        }

        for key in schema.amount_keys() {
            let key = policy.apply(&key);
            let Some(raw) = self.get_str(&key).map(str::trim) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            if raw.contains(',') {
                issues.push(format!("Field {} uses ',' as decimal separator: {}", key, raw));
            } else if !PLAIN_AMOUNT.is_match(raw) {
                issues.push(format!("Field {} is not a plain decimal amount: {}", key, raw));
            }
        }

        if let Some(rule) = schema.balance() {
            let amount = |key: &str| {
                self.get_str(&policy.apply(key))
                    .and_then(|v| Decimal::from_str(v.trim()).ok())
            };
            if let (Some(gross), Some(deductions), Some(net)) =
                (amount(&rule.gross), amount(&rule.deductions), amount(&rule.net))
            {
                let expected = gross - deductions;
                if (expected - net).abs() > Decimal::new(1, 2) {
                    issues.push(format!(
                        "{} - {} = {} but {} is {}",
                        rule.gross, rule.deductions, expected, rule.net, net
                    ));
                }
            }
        }

        issues
    }
}

/// Stand-in for a record when a document fails irrecoverably.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    /// User-visible cause.
    pub cause: String,
    /// Raw reply or HTTP body, for operators only. Never serialized.
    pub diagnostic: Option<String>,
}

impl ErrorRecord {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }
}

impl From<&DocfieldError> for ErrorRecord {
    fn from(err: &DocfieldError) -> Self {
        let record = ErrorRecord::new(format!("Erro ao processar o PDF: {}", err));
        match err.diagnostic() {
            Some(detail) => record.with_diagnostic(detail),
            None => record,
        }
    }
}

impl Serialize for ErrorRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(ERROR_KEY, &self.cause)?;
        map.end()
    }
}

/// What one document produced: a record or an error record, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentOutcome {
    Extracted(ExtractedRecord),
    Failed(ErrorRecord),
}

impl DocumentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Extracted(_))
    }

    pub fn record(&self) -> Option<&ExtractedRecord> {
        match self {
            Self::Extracted(record) => Some(record),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Extracted(_) => None,
            Self::Failed(error) => Some(error),
        }
    }
}

impl From<crate::Result<ExtractedRecord>> for DocumentOutcome {
    fn from(result: crate::Result<ExtractedRecord>) -> Self {
        match result {
            Ok(record) => Self::Extracted(record),
            Err(err) => Self::Failed(ErrorRecord::from(&err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecoveryError;
    use docfield_inference::InferenceError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> ExtractedRecord {
        match value {
            Value::Object(map) => ExtractedRecord::new(map),
            _ => unreachable!(),
        }
    }

    fn full_payroll() -> Value {
        let mut map = ExtractionSchema::payroll().skeleton();
        map.insert("TOTAL_BRUTO".into(), json!("5000.00"));
        map.insert("TOTAL_DESCONTOS".into(), json!("750.50"));
        map.insert("VALOR_LIQUIDO".into(), json!("4249.50"));
        Value::Object(map)
    }

    #[test]
    fn test_valid_payroll_has_no_issues() {
        let issues = record(full_payroll()).validate(&ExtractionSchema::payroll(), KeyPolicy::Verbatim);
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_validation_reports_without_changing_record() {
        let mut value = full_payroll();
        value["VALOR_LIQUIDO"] = json!("4000.00");
        value["SALARIO_COL2"] = json!("5.000,00");
        value["EXTRA"] = json!(3);
        value.as_object_mut().unwrap().remove("NOME");
        let rec = record(value.clone());

        let issues = rec.validate(&ExtractionSchema::payroll(), KeyPolicy::Verbatim);

        assert!(issues.iter().any(|i| i == "Missing field NOME"));
        assert!(issues.iter().any(|i| i.contains("SALARIO_COL2 uses ','")));
        assert!(issues.iter().any(|i| i.contains("EXTRA is not a string")));
        assert!(issues.iter().any(|i| i.contains("VALOR_LIQUIDO is 4000.00")));
        assert_eq!(rec, record(value));
    }

    #[test]
    fn test_canonical_validation_uses_canonical_keys() {
        let rec = record(json!({"TOTAL": "100.00", "VALORDOISS": "5.00"}));
        let issues = rec.validate(&ExtractionSchema::invoice(), KeyPolicy::Canonical);
        assert!(!issues.iter().any(|i| i.contains("VALORDOISS")));
        assert!(issues.iter().any(|i| i == "Missing field VALORDOSERVICO"));
    }

    #[test]
    fn test_filled_count_ignores_empty_values() {
        let rec = record(json!({"A": "", "B": "1", "C": null, "D": 2}));
        assert_eq!(rec.filled_count(), 2);
    }

    #[test]
    fn test_error_record_serializes_single_reserved_key() {
        let err = ErrorRecord::new("boom").with_diagnostic("raw text");
        assert_eq!(serde_json::to_value(&err).unwrap(), json!({"Erro": "boom"}));
    }

    #[test]
    fn test_outcome_from_inference_failure_keeps_status_and_body() {
        let err: DocfieldError = InferenceError::Status {
            status: 502,
            body: "bad gateway".into(),
        }
        .into();
        let outcome = DocumentOutcome::from(Err(err));

        let error = outcome.error().unwrap();
        assert!(error.cause.contains("502"));
        assert!(error.cause.contains("bad gateway"));
        assert_eq!(error.diagnostic.as_deref(), Some("bad gateway"));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_outcome_from_recovery_failure_keeps_raw_reply() {
        let err: DocfieldError = RecoveryError {
            raw: "sorry, no json".into(),
            candidates: 0,
        }
        .into();
        let outcome = DocumentOutcome::from(Err(err));
        assert_eq!(outcome.error().unwrap().diagnostic.as_deref(), Some("sorry, no json"));
    }

    #[test]
    fn test_extracted_outcome_serializes_as_plain_record() {
        let outcome = DocumentOutcome::Extracted(record(json!({"TOTAL": "100.00", "ISS": ""})));
        assert_eq!(
            serde_json::to_string(&outcome).unwrap(),
            r#"{"TOTAL":"100.00","ISS":""}"#
        );
    }
}
