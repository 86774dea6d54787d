//! # paperseg
//!
//! Exam-paper PDF extraction and question segmentation for Rust.
//!
//! The library reads a PDF held in memory into pages of positioned text
//! and image runs, then groups those runs into labelled questions
//! ("1", "2(a)", "3(c)(ii)") with their mark allocations.
//!
//! ## Quick Start
//!
//! ```no_run
//! use paperseg::parse_file;
//!
//! fn main() -> paperseg::Result<()> {
//!     let paper = parse_file("economics-paper-1.pdf")?;
//!
//!     for question in paper.questions() {
//!         println!("{} ({:?} marks): {}", question.label, question.marks, question.plain_text());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Run extraction**: font, size, style, colour and position per text run
//! - **Image extraction**: embedded images as JPEG or PNG with placements
//! - **Segmentation**: label and marks detection with a font-size noise filter
//! - **Publishing**: blob and paper store seams with filesystem and memory backends
//! - **Parallel processing**: Uses Rayon for multi-page documents

pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;
pub mod segment;
pub mod store;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, is_pdf_bytes, PdfFormat};
pub use error::{Error, Result};
pub use model::{
    BoundingBox, ContentItem, Document, ExtractWarning, ImageRun, Metadata, Page, PaperMetadata,
    Question, TextRun,
};
pub use parser::{ErrorMode, ExtractOptions, PageSelection, PdfExtractor};
pub use render::JsonFormat;
pub use segment::{segment, ImagePlacement, SegmentOptions, Segmenter};
pub use store::{
    publish, BlobStore, DirectoryBlobStore, IngestReport, MemoryPaperStore, PaperStore,
};

use std::io::Read;
use std::path::Path;

/// Extract pages, runs and images from PDF bytes.
///
/// # Example
///
/// ```no_run
/// use paperseg::extract;
///
/// let data = std::fs::read("paper.pdf").unwrap();
/// let doc = extract(&data).unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn extract(data: &[u8]) -> Result<Document> {
    PdfExtractor::from_bytes(data)?.extract()
}

/// Extract a PDF from bytes with custom options.
pub fn extract_with_options(data: &[u8], options: ExtractOptions) -> Result<Document> {
    PdfExtractor::from_bytes_with_options(data, options)?.extract()
}

/// Extract and prepare a PDF from bytes for segmentation.
///
/// # Example
///
/// ```no_run
/// use paperseg::parse_bytes;
///
/// let data = std::fs::read("paper.pdf").unwrap();
/// let paper = parse_bytes(&data).unwrap();
/// println!("Questions: {}", paper.questions().len());
/// ```
pub fn parse_bytes(data: &[u8]) -> Result<ParsedPaper> {
    Paperseg::new().parse_bytes(data)
}

/// Extract and prepare a PDF file for segmentation.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ParsedPaper> {
    Paperseg::new().parse(path)
}

/// Extract and prepare a PDF from a reader for segmentation.
pub fn parse_reader<R: Read>(reader: R) -> Result<ParsedPaper> {
    Paperseg::new().parse_reader(reader)
}

/// Builder for extraction plus segmentation.
///
/// # Example
///
/// ```no_run
/// use paperseg::{Paperseg, JsonFormat};
///
/// let json = Paperseg::new()
///     .sequential()
///     .with_min_label_font_size(10.0)
///     .parse("paper.pdf")?
///     .questions_json(JsonFormat::Pretty)?;
/// # Ok::<(), paperseg::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Paperseg {
    extract_options: ExtractOptions,
    segment_options: SegmentOptions,
}

impl Paperseg {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on unreadable page content instead of skipping it.
    pub fn strict(mut self) -> Self {
        self.extract_options = self.extract_options.strict();
        self
    }

    /// Skip image extraction.
    pub fn text_only(mut self) -> Self {
        self.extract_options = self.extract_options.text_only();
        self
    }

    /// Disable parallel page extraction.
    pub fn sequential(mut self) -> Self {
        self.extract_options = self.extract_options.sequential();
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.extract_options = self.extract_options.with_pages(pages);
        self
    }

    /// Set the minimum font size for question labels.
    pub fn with_min_label_font_size(mut self, size: f32) -> Self {
        self.segment_options = self.segment_options.with_min_label_font_size(size);
        self
    }

    /// Set how images are attached to questions.
    pub fn with_image_placement(mut self, placement: ImagePlacement) -> Self {
        self.segment_options = self.segment_options.with_image_placement(placement);
        self
    }

    /// Parse a PDF file.
    pub fn parse<P: AsRef<Path>>(self, path: P) -> Result<ParsedPaper> {
        let extractor = PdfExtractor::open_with_options(path, self.extract_options)?;
        Ok(ParsedPaper {
            document: extractor.extract()?,
            segmenter: Segmenter::new(self.segment_options),
        })
    }

    /// Parse a PDF from bytes.
    pub fn parse_bytes(self, data: &[u8]) -> Result<ParsedPaper> {
        let extractor = PdfExtractor::from_bytes_with_options(data, self.extract_options)?;
        Ok(ParsedPaper {
            document: extractor.extract()?,
            segmenter: Segmenter::new(self.segment_options),
        })
    }

    /// Parse a PDF from a reader.
    pub fn parse_reader<R: Read>(self, reader: R) -> Result<ParsedPaper> {
        let extractor = PdfExtractor::from_reader_with_options(reader, self.extract_options)?;
        Ok(ParsedPaper {
            document: extractor.extract()?,
            segmenter: Segmenter::new(self.segment_options),
        })
    }
}

/// An extracted document together with the segmenter to apply to it.
///
/// Questions borrow their runs from the document, so they are produced on
/// demand rather than stored.
#[derive(Debug, Clone)]
pub struct ParsedPaper {
    /// The extracted document
    pub document: Document,
    segmenter: Segmenter,
}

impl ParsedPaper {
    /// Segment the document into questions.
    pub fn questions(&self) -> Vec<Question<'_>> {
        self.segmenter.segment(&self.document.pages)
    }

    /// Questions as JSON.
    pub fn questions_json(&self, format: JsonFormat) -> Result<String> {
        render::to_json(&self.questions(), format)
    }

    /// Questions as plain text blocks.
    pub fn questions_text(&self) -> String {
        render::questions_to_text(&self.questions())
    }

    /// The whole document as JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        render::to_json(&self.document, format)
    }

    /// Page text without segmentation.
    pub fn plain_text(&self) -> String {
        render::to_text(&self.document)
    }

    /// Upload images and store the segmented paper.
    pub fn publish<B, P>(&self, metadata: &PaperMetadata, blobs: &B, papers: &P) -> Result<IngestReport>
    where
        B: BlobStore + ?Sized,
        P: PaperStore + ?Sized,
    {
        store::publish(metadata, &self.questions(), blobs, papers)
    }

    /// Get the document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Non-fatal extraction problems.
    pub fn warnings(&self) -> &[ExtractWarning] {
        &self.document.warnings
    }
}
