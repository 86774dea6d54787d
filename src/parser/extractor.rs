//! PDF document extractor using lopdf.

use std::io::Read;
use std::path::Path;

use lopdf::{Document as LopdfDocument, ObjectId};
use rayon::prelude::*;

use crate::detect::{detect_format_from_bytes, PdfFormat};
use crate::error::{Error, Result};
use crate::model::{Document, ExtractWarning, ImageRun, Metadata, Page};

use super::content::{ContentInterpreter, PageContent};
use super::images::{encode_image, image_table};
use super::objects::{decode_text_simple, page_box, page_content, page_resources};
use super::options::{ErrorMode, ExtractOptions};

/// PDF document extractor.
pub struct PdfExtractor {
    doc: LopdfDocument,
    format: PdfFormat,
    options: ExtractOptions,
}

impl PdfExtractor {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ExtractOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes_with_options(&data, options)
    }

    /// Load a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ExtractOptions::default())
    }

    /// Load a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ExtractOptions) -> Result<Self> {
        let format = detect_format_from_bytes(data)?;

        let doc = LopdfDocument::load_mem(data)
            .map_err(|e| Error::MalformedDocument(format!("cannot open document: {}", e)))?;

        if doc.is_encrypted() {
            log::debug!("document is encrypted; relying on empty user password");
        }

        Ok(Self {
            doc,
            format,
            options,
        })
    }

    /// Load a PDF from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, ExtractOptions::default())
    }

    /// Load a PDF from a reader with custom options.
    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ExtractOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(&data, options)
    }

    /// Extract metadata and every selected page.
    pub fn extract(&self) -> Result<Document> {
        let mut document = Document::new();
        document.metadata = self.extract_metadata();

        let page_ids = self.doc.get_pages();
        document.metadata.page_count = page_ids.len() as u32;

        let selected: Vec<(u32, ObjectId)> = page_ids
            .into_iter()
            .filter(|(number, _)| self.options.pages.includes(*number))
            .collect();

        // Collecting into a Vec keeps page order regardless of scheduling.
        let pages: Vec<(Page, Vec<ExtractWarning>)> = if self.options.parallel {
            selected
                .par_iter()
                .map(|&(number, id)| self.extract_page(number, id))
                .collect::<Result<_>>()?
        } else {
            selected
                .iter()
                .map(|&(number, id)| self.extract_page(number, id))
                .collect::<Result<_>>()?
        };

        for (page, warnings) in pages {
            document.add_page(page);
            document.warnings.extend(warnings);
        }

        log::debug!(
            "extracted {} pages, {} text runs, {} images, {} warnings",
            document.page_count(),
            document.pages.iter().map(|p| p.text_runs.len()).sum::<usize>(),
            document.image_count(),
            document.warnings.len()
        );

        Ok(document)
    }

    /// Extract a single page by number (1-indexed).
    pub fn extract_page_number(&self, page_num: u32) -> Result<Page> {
        let pages = self.doc.get_pages();
        let id = *pages
            .get(&page_num)
            .ok_or(Error::PageOutOfRange(page_num, pages.len() as u32))?;
        self.extract_page(page_num, id).map(|(page, _)| page)
    }

    /// Extract document metadata.
    fn extract_metadata(&self) -> Metadata {
        let mut metadata = Metadata::with_version(self.format.version.clone());

        let info = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| obj.as_reference().ok())
            .and_then(|id| self.doc.get_dictionary(id).ok());

        if let Some(info) = info {
            let field = |key: &[u8]| get_string_from_dict(info, key).unwrap_or_default();
            metadata.title = field(b"Title");
            metadata.author = field(b"Author");
            metadata.subject = field(b"Subject");
            metadata.keywords = field(b"Keywords");
            metadata.creator = field(b"Creator");
            metadata.producer = field(b"Producer");
            metadata.created = get_string_from_dict(info, b"CreationDate")
                .as_deref()
                .and_then(parse_pdf_date);
            metadata.modified = get_string_from_dict(info, b"ModDate")
                .as_deref()
                .and_then(parse_pdf_date);
        }

        metadata.encrypted = self.doc.is_encrypted();
        metadata
    }

    /// Extract one page's text runs and images.
    fn extract_page(&self, page_num: u32, page_id: ObjectId) -> Result<(Page, Vec<ExtractWarning>)> {
        let doc = &self.doc;
        let bounds = page_box(doc, page_id);
        let resources = page_resources(doc, page_id);
        let mut page = Page::new(page_num, bounds.width(), bounds.height());
        let mut warnings = Vec::new();

        let content = page_content(doc, page_id)
            .and_then(|bytes| ContentInterpreter::new(doc, bounds).run(&bytes, resources));
        let content = match content {
            Ok(content) => content,
            Err(e) => {
                if self.options.error_mode == ErrorMode::Strict {
                    return Err(e);
                }
                log::warn!("Failed to read content of page {}: {}", page_num, e);
                warnings.push(ExtractWarning {
                    page: page_num,
                    image_index: None,
                    reason: e.to_string(),
                });
                PageContent::default()
            }
        };

        for run in content.runs {
            page.add_text(run);
        }

        if self.options.extract_images {
            for entry in image_table(doc, resources) {
                let placed = entry
                    .placement(&content.placements)
                    .ok_or_else(|| "image is never painted on the page".to_string())
                    .and_then(|bbox| encode_image(doc, entry.stream).map(|image| (image, bbox)));

                match placed {
                    Ok((image, bbox)) => page.add_image(ImageRun {
                        data: image.data,
                        format: image.format.to_string(),
                        width: image.width,
                        height: image.height,
                        bbox,
                        index: entry.index,
                        page: page_num,
                    }),
                    Err(reason) => {
                        let err = Error::ImageDecodeFailed {
                            page: page_num,
                            index: entry.index,
                            reason: reason.clone(),
                        };
                        log::warn!("Skipping image: {}", err);
                        warnings.push(ExtractWarning {
                            page: page_num,
                            image_index: Some(entry.index),
                            reason,
                        });
                    }
                }
            }
        }

        Ok((page, warnings))
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Check if the document is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// PDF version from the file header.
    pub fn version(&self) -> &str {
        &self.format.version
    }
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        lopdf::Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        lopdf::Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    let local = chrono::NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    // Offset suffix: Z, or +HH'mm / -HH'mm
    let offset_minutes = match s.get(14..15) {
        Some(sign @ ("+" | "-")) => {
            let hours: i64 = s.get(15..17).and_then(|h| h.parse().ok()).unwrap_or(0);
            let minutes: i64 = s
                .get(18..20)
                .and_then(|m| m.parse().ok())
                .unwrap_or(0);
            let total = hours * 60 + minutes;
            if sign == "-" {
                -total
            } else {
                total
            }
        }
        _ => 0,
    };

    let utc = local - chrono::Duration::minutes(offset_minutes);
    Some(chrono::DateTime::from_naive_utc_and_offset(utc, chrono::Utc))
}
