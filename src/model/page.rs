//! Page-level types.

use super::{ImageRun, TextRun};
use serde::{Deserialize, Serialize};

/// A single page as produced by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Text runs in content-stream order
    pub text_runs: Vec<TextRun>,

    /// Image runs in image-table order
    pub image_runs: Vec<ImageRun>,
}

impl Page {
    /// Create a new page with the given dimensions.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            text_runs: Vec::new(),
            image_runs: Vec::new(),
        }
    }

    /// Create a new page with standard A4 size (210 x 297 mm).
    pub fn a4(number: u32) -> Self {
        Self::new(number, 595.0, 842.0)
    }

    /// Append a text run.
    pub fn add_text(&mut self, run: TextRun) {
        self.text_runs.push(run);
    }

    /// Append an image run.
    pub fn add_image(&mut self, image: ImageRun) {
        self.image_runs.push(image);
    }

    /// Check if the page has neither text nor images.
    pub fn is_empty(&self) -> bool {
        self.text_runs.is_empty() && self.image_runs.is_empty()
    }

    /// Get plain text content of the page, one run per line.
    pub fn plain_text(&self) -> String {
        self.text_runs
            .iter()
            .map(|run| run.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Get page dimensions as (width, height) tuple.
    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::a4(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_new() {
        let page = Page::new(1, 612.0, 792.0);
        assert_eq!(page.number, 1);
        assert_eq!(page.dimensions(), (612.0, 792.0));
        assert!(page.is_empty());
    }

    #[test]
    fn test_plain_text() {
        let mut page = Page::a4(3);
        page.add_text(TextRun::new("1 Define GDP.", 11.0));
        page.add_text(TextRun::new("Explain.", 11.0));
        assert!(!page.is_empty());
        assert_eq!(page.plain_text(), "1 Define GDP.\nExplain.");
    }
}
