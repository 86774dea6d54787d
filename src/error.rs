//! Error types for paperseg.

use std::io;
use thiserror::Error;

/// Result type alias for paperseg operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, segmenting or publishing a paper.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input could not be opened as a PDF document.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A single embedded image could not be decoded or placed.
    ///
    /// Never aborts extraction; the extractor records it as a warning and
    /// drops the image.
    #[error("Image {index} on page {page} could not be decoded: {reason}")]
    ImageDecodeFailed {
        /// 1-indexed page number
        page: u32,
        /// Position in the page's image table
        index: usize,
        /// What went wrong
        reason: String,
    },

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Caller-supplied paper metadata failed validation.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// A blob or paper store rejected an operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error during rendering (JSON, text).
    #[error("Rendering error: {0}")]
    Render(String),
}

impl Error {
    /// Whether the failure was caused by the caller's input.
    ///
    /// A transport layer maps these to a 4xx response and everything else
    /// to a 5xx response.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::MalformedDocument(_) | Error::InvalidMetadata(_))
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::MalformedDocument(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Render(format!("JSON serialization error: {}", err))
    }
}
