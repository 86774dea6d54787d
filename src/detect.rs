//! PDF header detection.

use crate::error::{Error, Result};

/// PDF format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
    /// Byte offset of the `%PDF-` marker
    pub header_offset: usize,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Readers accept junk before the header as long as it starts in the first KiB.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Detect the PDF header in a byte buffer.
///
/// # Returns
/// * `Ok(PdfFormat)` if a valid header starts within the first 1024 bytes
/// * `Err(Error::MalformedDocument)` otherwise
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfFormat> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW + PDF_MAGIC.len())];
    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or_else(|| Error::MalformedDocument("no %PDF- header found".to_string()))?;

    let version_start = offset + PDF_MAGIC.len();
    let version_bytes = data
        .get(version_start..version_start + VERSION_LEN)
        .ok_or_else(|| Error::MalformedDocument("truncated PDF header".to_string()))?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::MalformedDocument(format!(
            "unsupported PDF version {:?}",
            version
        )));
    }

    Ok(PdfFormat {
        version,
        header_offset: offset,
    })
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

/// Check if bytes start like a PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}
