//! Key canonicalization for loosely-written field names.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Characters dropped from canonical keys besides whitespace.
const DROPPED: &[char] = &['(', ')', '"', '\'', '.', '_'];

/// Fold a key to its canonical form.
///
/// Diacritics are stripped, letters uppercased, and whitespace, parentheses,
/// quotes, dots and underscores removed. `"Valor Do Serviço"`,
/// `"valor do servico"` and `"VALOR_DO_SERVICO"` all become `"VALORDOSERVICO"`.
pub fn canonical_key(key: &str) -> String {
    key.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_uppercase)
        .filter(|c| !c.is_whitespace() && !DROPPED.contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_spellings_collapse_to_one_key() {
        assert_eq!(canonical_key("Valor Do Serviço"), "VALORDOSERVICO");
        assert_eq!(canonical_key("valor do servico"), "VALORDOSERVICO");
        assert_eq!(canonical_key("VALOR_DO_SERVICO"), "VALORDOSERVICO");
        assert_eq!(canonical_key("  VALOR  DO\tSERVIÇO "), "VALORDOSERVICO");
    }

    #[test]
    fn test_punctuation_is_dropped() {
        assert_eq!(canonical_key("BASE DE CÁLCULO(R$)"), "BASEDECALCULOR$");
        assert_eq!(canonical_key("ALIQUOTA(%)"), "ALIQUOTA%");
        assert_eq!(canonical_key("QTD."), "QTD");
        assert_eq!(canonical_key("\"DEDUÇÃO\""), "DEDUCAO");
        assert_eq!(canonical_key("'Iss'"), "ISS");
    }

    #[test]
    fn test_idempotent() {
        for key in ["Valor Do Serviço", "ALIQUOTA(%)", "qtd.", "Dedução"] {
            let once = canonical_key(key);
            assert_eq!(canonical_key(&once), once);
        }
    }

    #[test]
    fn test_empty_key() {
        assert_eq!(canonical_key(""), "");
        assert_eq!(canonical_key(" ._ "), "");
    }
}
