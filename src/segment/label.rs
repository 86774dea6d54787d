//! Question label recognition.

use regex::Regex;

/// Digits, then an optional `(letter)` part, then an optional roman-numeral
/// part, e.g. "3", "2(a)", "3 (c)(ii)".
const LABEL_PATTERN: &str = r"^(\d+)(\s*\([a-z]\))?(\s*\([ivxIVX]+\))?\s*";

/// Matches question-number tokens at the start of a text run.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    pattern: Regex,
}

impl LabelMatcher {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(LABEL_PATTERN).expect("label pattern is a valid regex"),
        }
    }

    /// The label token at the start of `text`, trimmed.
    ///
    /// Leading and trailing whitespace of `text` is ignored.
    pub fn find(&self, text: &str) -> Option<String> {
        self.pattern
            .find(text.trim())
            .map(|m| m.as_str().trim().to_string())
            .filter(|label| !label.is_empty())
    }
}

impl Default for LabelMatcher {
    fn default() -> Self {
        Self::new()
    }
}
