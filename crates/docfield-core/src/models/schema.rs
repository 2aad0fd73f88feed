//! Extraction schemas: the fixed, ordered field sets per document class.

use serde_json::{Map, Value};

use crate::recovery::normalize::canonical_key;

/// Suffix of the quantity/rate column of a two-column field.
pub const COL1_SUFFIX: &str = "_COL1";

/// Suffix of the monetary amount column of a two-column field.
pub const COL2_SUFFIX: &str = "_COL2";

/// Shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text (names, periods, identifiers).
    Text,
    /// A single monetary amount.
    Amount,
    /// A line item with a quantity/rate column and an amount column.
    TwoColumn,
}

/// One named field of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
}

impl FieldSpec {
    pub fn text(name: &str) -> Self {
        Self { name: name.to_string(), kind: FieldKind::Text }
    }

    pub fn amount(name: &str) -> Self {
        Self { name: name.to_string(), kind: FieldKind::Amount }
    }

    pub fn two_column(name: &str) -> Self {
        Self { name: name.to_string(), kind: FieldKind::TwoColumn }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Output keys of this field, in order. Two-column fields expand to two keys.
    pub fn keys(&self) -> Vec<String> {
        match self.kind {
            FieldKind::TwoColumn => vec![
                format!("{}{}", self.name, COL1_SUFFIX),
                format!("{}{}", self.name, COL2_SUFFIX),
            ],
            _ => vec![self.name.clone()],
        }
    }

    /// Keys whose value must be a decimal amount.
    fn amount_keys(&self) -> Vec<String> {
        match self.kind {
            FieldKind::Text => vec![],
            FieldKind::Amount => vec![self.name.clone()],
            FieldKind::TwoColumn => vec![format!("{}{}", self.name, COL2_SUFFIX)],
        }
    }
}

/// Gross/deductions/net triple that must balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRule {
    pub gross: String,
    pub deductions: String,
    pub net: String,
}

/// How reply keys are mapped onto output keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Keys pass through exactly as the model wrote them.
    #[default]
    Verbatim,
    /// Keys are folded to their canonical form (see [`canonical_key`]).
    Canonical,
}

impl KeyPolicy {
    /// Apply the policy to one key.
    pub fn apply(&self, key: &str) -> String {
        match self {
            Self::Verbatim => key.to_string(),
            Self::Canonical => canonical_key(key),
        }
    }
}

/// An ordered, immutable set of named fields for one document class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSchema {
    name: String,
    fields: Vec<FieldSpec>,
    balance: Option<BalanceRule>,
}

impl ExtractionSchema {
    /// Create a schema from its fields.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
            balance: None,
        }
    }

    /// Attach a balance rule checked by record validation.
    pub fn with_balance(mut self, gross: &str, deductions: &str, net: &str) -> Self {
        self.balance = Some(BalanceRule {
            gross: gross.to_string(),
            deductions: deductions.to_string(),
            net: net.to_string(),
        });
        self
    }

    /// Brazilian payroll statement (holerite).
    pub fn payroll() -> Self {
        let mut fields: Vec<FieldSpec> = ["NOME", "MATRICULA", "FUNCAO", "PERIODO", "EMPRESA"]
            .into_iter()
            .map(FieldSpec::text)
            .collect();
        fields.extend(
            [
                "SALARIO",
                "PTS",
                "BOG",
                "INSS",
                "IRRF",
                "ADIANTAMENTO",
                "VALE_REFEICAO",
                "PLANO_SAUDE",
                "PLANO_ODONTO",
                "COMBUSTIVEL",
            ]
            .into_iter()
            .map(FieldSpec::two_column),
        );
        fields.extend(
            ["TOTAL_BRUTO", "TOTAL_DESCONTOS", "VALOR_LIQUIDO"]
                .into_iter()
                .map(FieldSpec::amount),
        );

        Self::new("payroll", fields).with_balance("TOTAL_BRUTO", "TOTAL_DESCONTOS", "VALOR_LIQUIDO")
    }

    /// Brazilian service invoice (nota fiscal de serviço).
    pub fn invoice() -> Self {
        let fields = [
            "TOTAL",
            "VALOR DO ISS",
            "ALIQUOTA(%)",
            "BASE DE CÁLCULO(R$)",
            "DEDUÇÃO",
            "DESCONTO",
            "QTD.",
            "VALOR DO SERVIÇO",
            "INSS",
            "PIS",
            "COFINS",
            "CSLL",
            "IRRF",
        ]
        .into_iter()
        .map(FieldSpec::amount)
        .collect();

        Self::new("invoice", fields)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn balance(&self) -> Option<&BalanceRule> {
        self.balance.as_ref()
    }

    /// All output keys in schema order.
    pub fn keys(&self) -> Vec<String> {
        self.fields.iter().flat_map(FieldSpec::keys).collect()
    }

    /// Keys holding decimal amounts.
    pub fn amount_keys(&self) -> Vec<String> {
        self.fields.iter().flat_map(FieldSpec::amount_keys).collect()
    }

    /// The JSON shape the model must fill: every key mapped to `""`.
    pub fn skeleton(&self) -> Map<String, Value> {
        self.keys()
            .into_iter()
            .map(|key| (key, Value::String(String::new())))
            .collect()
    }

    /// Whether the schema has any two-column field.
    pub fn has_two_column_fields(&self) -> bool {
        self.fields.iter().any(|f| f.kind == FieldKind::TwoColumn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_payroll_expands_two_column_fields() {
        let schema = ExtractionSchema::payroll();
        let keys = schema.keys();

        assert_eq!(keys.len(), 5 + 10 * 2 + 3);
        assert_eq!(&keys[..7], &["NOME", "MATRICULA", "FUNCAO", "PERIODO", "EMPRESA", "SALARIO_COL1", "SALARIO_COL2"]);
        assert_eq!(keys.last().map(String::as_str), Some("VALOR_LIQUIDO"));
        assert!(schema.has_two_column_fields());
    }

    #[test]
    fn test_skeleton_has_every_key_empty() {
        for schema in [ExtractionSchema::payroll(), ExtractionSchema::invoice()] {
            let skeleton = schema.skeleton();
            assert_eq!(skeleton.keys().cloned().collect::<Vec<_>>(), schema.keys());
            assert!(skeleton.values().all(|v| v == &Value::String(String::new())));
        }
    }

    #[test]
    fn test_amount_keys_use_money_column() {
        let schema = ExtractionSchema::payroll();
        let amounts = schema.amount_keys();
        assert!(amounts.contains(&"SALARIO_COL2".to_string()));
        assert!(!amounts.contains(&"SALARIO_COL1".to_string()));
        assert!(!amounts.contains(&"NOME".to_string()));
        assert!(amounts.contains(&"VALOR_LIQUIDO".to_string()));
    }

    #[test]
    fn test_key_policy() {
        assert_eq!(KeyPolicy::Verbatim.apply("Valor Do Serviço"), "Valor Do Serviço");
        assert_eq!(KeyPolicy::Canonical.apply("Valor Do Serviço"), "VALORDOSERVICO");
    }
}
