//! Document model types.
//!
//! The extractor produces [`Document`]s made of [`Page`]s holding
//! [`TextRun`]s and [`ImageRun`]s; the segmenter regroups borrowed runs
//! into [`Question`]s. Nothing here knows about PDF internals.

mod document;
mod page;
mod paper;
mod question;
mod run;

pub use document::{Document, ExtractWarning, Metadata};
pub use page::Page;
pub use paper::{PaperMetadata, MAX_PAPER_NUMBER, MAX_YEAR, MIN_YEAR};
pub use question::{ContentItem, Question};
pub use run::{round2, BoundingBox, ImageRun, TextRun, DEFAULT_FONT_SIZE, UNKNOWN_FONT};
