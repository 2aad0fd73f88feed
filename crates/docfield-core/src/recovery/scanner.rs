//! Candidate block scanner.
//!
//! A candidate is the text from a `{` up to and including the nearest
//! following `}`. Braces do not nest: a `{` seen while a candidate is open
//! is ordinary content, and the first `}` closes the candidate. Scanning
//! then resumes right after the `}`.
//!
//! A value holding a nested object is therefore split at the inner `}`.
//! That is the scanner's contract, not an accident.

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Not inside a candidate.
    Outside,
    /// Inside a candidate opened at byte offset `start`.
    Inside { start: usize },
    /// A candidate spanning `start..=end` was just closed.
    Closed { start: usize, end: usize },
}

/// Iterator over candidate blocks, in order of appearance.
pub struct Candidates<'a> {
    text: &'a str,
    chars: std::str::CharIndices<'a>,
    state: ScanState,
}

impl<'a> Iterator for Candidates<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        for (offset, ch) in self.chars.by_ref() {
            self.state = match (self.state, ch) {
                (ScanState::Outside | ScanState::Closed { .. }, '{') => ScanState::Inside { start: offset },
                (ScanState::Inside { start }, '}') => ScanState::Closed { start, end: offset },
                (ScanState::Closed { .. }, _) => ScanState::Outside,
                (state, _) => state,
            };

            if let ScanState::Closed { start, end } = self.state {
                return Some(&self.text[start..=end]);
            }
        }
        None
    }
}

/// Scan `text` for candidate blocks.
pub fn candidates(text: &str) -> Candidates<'_> {
    Candidates {
        text,
        chars: text.char_indices(),
        state: ScanState::Outside,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(text: &str) -> Vec<&str> {
        candidates(text).collect()
    }

    #[test]
    fn test_blocks_in_order() {
        assert_eq!(
            scan(r#"{"a": 1} extra text {"a": 2}"#),
            vec![r#"{"a": 1}"#, r#"{"a": 2}"#]
        );
    }

    #[test]
    fn test_no_braces() {
        assert!(scan("nothing structured here").is_empty());
        assert!(scan("").is_empty());
    }

    #[test]
    fn test_unclosed_block_is_not_a_candidate() {
        assert!(scan(r#"preamble {"a": 1"#).is_empty());
        assert_eq!(scan(r#"{"a": 1} {"b": 2"#), vec![r#"{"a": 1}"#]);
    }

    #[test]
    fn test_stray_closing_brace_is_ignored() {
        assert_eq!(scan(r#"} {"a": 1}"#), vec![r#"{"a": 1}"#]);
    }

    #[test]
    fn test_inner_open_brace_does_not_restart_candidate() {
        assert_eq!(scan(r#"{ x { y } z }"#), vec!["{ x { y }"]);
    }

    #[test]
    fn test_nested_object_is_split_at_inner_close() {
        let text = r#"{"a": {"b": 1}, "c": 2}"#;
        assert_eq!(scan(text), vec![r#"{"a": {"b": 1}"#]);
    }

    #[test]
    fn test_adjacent_blocks() {
        assert_eq!(scan("{}{}"), vec!["{}", "{}"]);
    }

    #[test]
    fn test_multibyte_text_around_blocks() {
        assert_eq!(
            scan("Aqui está: {\"SERVIÇO\": \"ção\"} – fim"),
            vec!["{\"SERVIÇO\": \"ção\"}"]
        );
    }
}
