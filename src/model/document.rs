//! Document-level types.

use super::Page;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An extracted PDF document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Pages in document order
    pub pages: Vec<Page>,

    /// Non-fatal problems hit during extraction
    pub warnings: Vec<ExtractWarning>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of extracted pages.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get a page by number (1-indexed).
    pub fn get_page(&self, page_num: u32) -> Option<&Page> {
        self.pages.iter().find(|page| page.number == page_num)
    }

    /// Add a page to the document.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Total number of images across all pages.
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.image_runs.len()).sum()
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Document metadata. Missing string fields are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Total number of pages in the source document
    pub page_count: u32,

    pub title: String,
    pub author: String,
    pub subject: String,
    pub creator: String,
    pub producer: String,
    pub keywords: String,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,

    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Whether the document is encrypted
    pub encrypted: bool,
}

impl Metadata {
    /// Create new metadata with PDF version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }
}

/// A recorded non-fatal extraction failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractWarning {
    /// 1-indexed page number
    pub page: u32,
    /// Image table index, when the warning concerns an image
    pub image_index: Option<usize>,
    pub reason: String,
}

impl std::fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.image_index {
            Some(index) => write!(f, "page {} image {}: {}", self.page, index, self.reason),
            None => write!(f, "page {}: {}", self.page, self.reason),
        }
    }
}
