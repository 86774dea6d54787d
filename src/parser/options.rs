//! Extraction options and configuration.

use std::ops::RangeInclusive;

/// Options for extracting PDF documents.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Whether to extract embedded images
    pub extract_images: bool,

    /// Whether to extract pages in parallel
    pub parallel: bool,

    /// Page selection (which pages to extract)
    pub pages: PageSelection,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Fail the whole document when a page's content cannot be read.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Enable or disable image extraction.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.extract_images = extract;
        self
    }

    /// Extract text runs only.
    pub fn text_only(mut self) -> Self {
        self.extract_images = false;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            extract_images: true,
            parallel: true,
            pages: PageSelection::All,
        }
    }
}

/// Error handling mode for page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on unreadable page content
    Strict,
    /// Log, keep the page without text and continue
    #[default]
    Lenient,
}

/// Page selection for extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Extract all pages
    #[default]
    All,
    /// Extract a range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Extract specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        if !s.contains(',') {
            if let Some((start, end)) = s.split_once('-') {
                let start = parse_page_number(start)?;
                let end = parse_page_number(end)?;
                if start > end {
                    return Err(format!("empty page range {}-{}", start, end));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start = parse_page_number(start)?;
                let end = parse_page_number(end)?;
                pages.extend(start..=end);
            } else {
                pages.push(parse_page_number(part)?);
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

fn parse_page_number(s: &str) -> Result<u32, String> {
    match s.trim().parse::<u32>() {
        Ok(0) => Err("page numbers start at 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("invalid page number '{}'", s.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_options_builder() {
        let options = ExtractOptions::new().strict().text_only().sequential();

        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert!(!options.extract_images);
        assert!(!options.parallel);
    }

    #[test]
    fn test_default_options() {
        let options = ExtractOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert!(options.parallel);
        assert!(options.extract_images);
        assert_eq!(options.pages, PageSelection::All);
    }

    #[test]
    fn test_page_selection_includes() {
        let range = PageSelection::Range(5..=10);
        assert!(!range.includes(4));
        assert!(range.includes(5));
        assert!(range.includes(10));
        assert!(!range.includes(11));

        let pages = PageSelection::Pages(vec![1, 3, 5, 7]);
        assert!(pages.includes(1));
        assert!(!pages.includes(2));
        assert!(PageSelection::All.includes(100));
    }

    #[test]
    fn test_page_selection_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::parse("").unwrap(), PageSelection::All);
        assert_eq!(
            PageSelection::parse("2-4").unwrap(),
            PageSelection::Range(2..=4)
        );
        assert_eq!(
            PageSelection::parse("5, 1,3-4,3").unwrap(),
            PageSelection::Pages(vec![1, 3, 4, 5])
        );
    }

    #[test]
    fn test_page_selection_parse_errors() {
        assert!(PageSelection::parse("0").is_err());
        assert!(PageSelection::parse("x").is_err());
        assert!(PageSelection::parse("4-2").is_err());
        assert!(PageSelection::parse("1,,2").is_err());
    }
}
