//! PDF extraction module.

mod content;
mod extractor;
mod fonts;
mod images;
mod objects;
mod options;

pub use content::Matrix;
pub use extractor::PdfExtractor;
pub use images::probe_dimensions;
pub use options::{ErrorMode, ExtractOptions, PageSelection};
