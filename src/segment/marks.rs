//! Mark allocation parsing.

use regex::Regex;

/// Tried in order; the first capture that parses wins. Only ASCII digits
/// count as a mark value.
const MARK_PATTERNS: [&str; 4] = [
    r"(?i)\[([0-9]+)\s*marks?\]",
    r"(?i)\(([0-9]+)\s*marks?\)",
    r"\[([0-9]+)\]",
    r"\(([0-9]+)\)",
];

/// Finds mark allocations such as `[6 marks]`, `(4 marks)`, `[3]` or `(2)`.
#[derive(Debug, Clone)]
pub struct MarksExtractor {
    patterns: Vec<Regex>,
}

impl MarksExtractor {
    pub fn new() -> Self {
        Self {
            patterns: MARK_PATTERNS
                .iter()
                .map(|p| Regex::new(p).expect("mark pattern is a valid regex"))
                .collect(),
        }
    }

    /// Mark allocation in `text`, if any.
    pub fn extract(&self, text: &str) -> Option<u32> {
        self.patterns.iter().find_map(|pattern| {
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    }
}

impl Default for MarksExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_forms() {
        let marks = MarksExtractor::new();
        assert_eq!(marks.extract("State one reason. [4 marks]"), Some(4));
        assert_eq!(marks.extract("(2)"), Some(2));
        assert_eq!(marks.extract("Explain. (6 Marks)"), Some(6));
        assert_eq!(marks.extract("Define. [1 mark]"), Some(1));
        assert_eq!(marks.extract("Define. [3]"), Some(3));
        assert_eq!(marks.extract("No marks here"), None);
    }

    #[test]
    fn test_pattern_priority() {
        let marks = MarksExtractor::new();
        // A bracketed "marks" form beats an earlier bare number.
        assert_eq!(marks.extract("(a) see (3) then [8 marks]"), Some(8));
        assert_eq!(marks.extract("[5] and (7)"), Some(5));
    }

    #[test]
    fn test_overflowing_number_falls_through() {
        let marks = MarksExtractor::new();
        assert_eq!(marks.extract("[99999999999 marks]"), None);
        assert_eq!(marks.extract("[99999999999 marks] (4)"), Some(4));
    }

    #[test]
    fn test_non_ascii_digits_are_not_marks() {
        let marks = MarksExtractor::new();
        assert_eq!(marks.extract("Explain. [\u{663}]"), None);
        assert_eq!(marks.extract("Explain. [\u{663} marks] (4)"), Some(4));
    }
}
