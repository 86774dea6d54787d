//! Font resources: names, glyph metrics, style flags and text decoding.

use std::collections::HashMap;

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use super::objects::{decode_text_simple, dict_get, dict_get_dict, get_name, get_number, resolve};

/// Style bitmask bit: superscript.
pub const FLAG_SUPERSCRIPT: u32 = 1 << 0;
/// Style bitmask bit: italic.
pub const FLAG_ITALIC: u32 = 1 << 1;
/// Style bitmask bit: serifed glyphs.
pub const FLAG_SERIF: u32 = 1 << 2;
/// Style bitmask bit: monospaced glyphs.
pub const FLAG_MONO: u32 = 1 << 3;
/// Style bitmask bit: bold.
pub const FLAG_BOLD: u32 = 1 << 4;

// FontDescriptor /Flags bits (PDF 32000-1, table 123).
const DESCRIPTOR_FIXED_PITCH: i64 = 1 << 0;
const DESCRIPTOR_SERIF: i64 = 1 << 1;
const DESCRIPTOR_ITALIC: i64 = 1 << 6;
const DESCRIPTOR_FORCE_BOLD: i64 = 1 << 18;

const DEFAULT_GLYPH_WIDTH: f32 = 500.0;
const DEFAULT_CID_WIDTH: f32 = 1000.0;
const DEFAULT_ASCENT: f32 = 800.0;
const DEFAULT_DESCENT: f32 = -200.0;

/// Longest CID range a `/W` entry may cover; two-byte codes stop here.
const MAX_CID_RANGE: u32 = 1 << 16;

type Decoder<'a> = Box<dyn Fn(&[u8]) -> String + 'a>;

/// Glyph advance widths in 1/1000 text-space units.
enum Widths {
    Simple { first_char: u32, widths: Vec<f32> },
    Cid { default: f32, widths: HashMap<u32, f32> },
}

/// A page font resource, ready for text decoding and measuring.
pub struct FontInfo<'a> {
    /// Family name without subset prefix
    pub family: String,
    /// Style bitmask (`FLAG_*`)
    pub flags: u32,
    /// Ascent in 1/1000 em
    pub ascent: f32,
    /// Descent in 1/1000 em (negative)
    pub descent: f32,
    two_byte: bool,
    widths: Widths,
    decoder: Decoder<'a>,
}

impl<'a> FontInfo<'a> {
    /// Build font information from a font dictionary.
    pub fn from_dict(doc: &'a LopdfDocument, font: &'a Dictionary) -> Self {
        let base_font = dict_get(doc, font, b"BaseFont")
            .and_then(get_name)
            .unwrap_or_default();
        let family = strip_subset_prefix(base_font).to_string();

        let subtype = dict_get(doc, font, b"Subtype").and_then(get_name);
        let two_byte = subtype == Some("Type0");

        // Composite fonts keep metrics on the descendant CIDFont.
        let metrics_dict = if two_byte {
            descendant_font(doc, font).unwrap_or(font)
        } else {
            font
        };
        let descriptor = dict_get_dict(doc, metrics_dict, b"FontDescriptor");

        let ascent = descriptor
            .and_then(|d| dict_get(doc, d, b"Ascent"))
            .and_then(get_number)
            .filter(|a| *a > 0.0)
            .unwrap_or(DEFAULT_ASCENT);
        let descent = descriptor
            .and_then(|d| dict_get(doc, d, b"Descent"))
            .and_then(get_number)
            .filter(|d| *d < 0.0)
            .unwrap_or(DEFAULT_DESCENT);

        let widths = if two_byte {
            cid_widths(doc, metrics_dict)
        } else {
            simple_widths(doc, font)
        };

        let decoder: Decoder<'a> = match font.get_font_encoding(doc) {
            Ok(encoding) => Box::new(move |bytes: &[u8]| {
                LopdfDocument::decode_text(&encoding, bytes)
                    .unwrap_or_else(|_| decode_text_simple(bytes))
            }),
            Err(_) => Box::new(decode_text_simple),
        };

        Self {
            flags: style_flags(&family, descriptor.map(|d| (doc, d))),
            family,
            ascent,
            descent,
            two_byte,
            widths,
            decoder,
        }
    }

    /// Metrics and decoding for a font name the resources do not define.
    pub fn fallback() -> Self {
        Self {
            family: String::new(),
            flags: 0,
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
            two_byte: false,
            widths: Widths::Simple {
                first_char: 0,
                widths: Vec::new(),
            },
            decoder: Box::new(decode_text_simple),
        }
    }

    /// Decode shown bytes to Unicode text.
    pub fn decode(&self, bytes: &[u8]) -> String {
        (self.decoder)(bytes)
    }

    /// Character codes in a shown string.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        }
    }

    /// Whether word spacing applies to this code.
    pub fn is_word_space(&self, code: u32) -> bool {
        !self.two_byte && code == 32
    }

    /// Advance width of a code in 1/1000 em.
    pub fn width(&self, code: u32) -> f32 {
        match &self.widths {
            Widths::Simple { first_char, widths } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .filter(|w| *w > 0.0)
                .unwrap_or(DEFAULT_GLYPH_WIDTH),
            Widths::Cid { default, widths } => widths.get(&code).copied().unwrap_or(*default),
        }
    }
}

/// Collect every font on a page keyed by resource name.
pub fn page_fonts<'a>(
    doc: &'a LopdfDocument,
    resources: Option<&'a Dictionary>,
) -> HashMap<Vec<u8>, FontInfo<'a>> {
    let mut fonts = HashMap::new();
    let Some(font_dict) = resources.and_then(|r| dict_get_dict(doc, r, b"Font")) else {
        return fonts;
    };
    for (name, obj) in font_dict.iter() {
        if let Object::Dictionary(font) = resolve(doc, obj) {
            fonts.insert(name.clone(), FontInfo::from_dict(doc, font));
        }
    }
    fonts
}

/// Drop the `ABCDEF+` subset tag embedders put in front of font names.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

fn style_flags(family: &str, descriptor: Option<(&LopdfDocument, &Dictionary)>) -> u32 {
    let mut flags = 0;
    let lower = family.to_lowercase();

    if lower.contains("bold") || lower.contains("black") || lower.contains("heavy") {
        flags |= FLAG_BOLD;
    }
    if lower.contains("italic") || lower.contains("oblique") {
        flags |= FLAG_ITALIC;
    }
    if lower.contains("mono") || lower.contains("courier") {
        flags |= FLAG_MONO;
    }

    if let Some((doc, descriptor)) = descriptor {
        let bits = dict_get(doc, descriptor, b"Flags")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        if bits & DESCRIPTOR_FIXED_PITCH != 0 {
            flags |= FLAG_MONO;
        }
        if bits & DESCRIPTOR_SERIF != 0 {
            flags |= FLAG_SERIF;
        }
        if bits & DESCRIPTOR_ITALIC != 0 {
            flags |= FLAG_ITALIC;
        }
        if bits & DESCRIPTOR_FORCE_BOLD != 0 {
            flags |= FLAG_BOLD;
        }
        let weight = dict_get(doc, descriptor, b"FontWeight").and_then(get_number);
        if weight.is_some_and(|w| w >= 600.0) {
            flags |= FLAG_BOLD;
        }
    }

    flags
}

fn descendant_font<'a>(doc: &'a LopdfDocument, font: &'a Dictionary) -> Option<&'a Dictionary> {
    let descendants = dict_get(doc, font, b"DescendantFonts")?.as_array().ok()?;
    match resolve(doc, descendants.first()?) {
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

fn simple_widths(doc: &LopdfDocument, font: &Dictionary) -> Widths {
    let first_char = dict_get(doc, font, b"FirstChar")
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0)
        .max(0) as u32;
    let widths = dict_get(doc, font, b"Widths")
        .and_then(|o| o.as_array().ok())
        .map(|arr| {
            arr.iter()
                .map(|w| get_number(resolve(doc, w)).unwrap_or(0.0))
                .collect()
        })
        .unwrap_or_default();
    Widths::Simple { first_char, widths }
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` or `c_first c_last w`.
fn cid_widths(doc: &LopdfDocument, cid_font: &Dictionary) -> Widths {
    let default = dict_get(doc, cid_font, b"DW")
        .and_then(get_number)
        .unwrap_or(DEFAULT_CID_WIDTH);
    let mut widths = HashMap::new();

    if let Some(items) = dict_get(doc, cid_font, b"W").and_then(|o| o.as_array().ok()) {
        let mut i = 0;
        while i < items.len() {
            let Some(start) = get_number(resolve(doc, &items[i])) else {
                break;
            };
            let start = start as u32;
            match items.get(i + 1).map(|o| resolve(doc, o)) {
                Some(Object::Array(list)) => {
                    for (offset, w) in list.iter().take(MAX_CID_RANGE as usize).enumerate() {
                        let Some(cid) = start.checked_add(offset as u32) else {
                            break;
                        };
                        if let Some(w) = get_number(resolve(doc, w)) {
                            widths.insert(cid, w);
                        }
                    }
                    i += 2;
                }
                Some(end) => {
                    let end = get_number(end).unwrap_or(start as f32) as u32;
                    let w = items
                        .get(i + 2)
                        .and_then(|o| get_number(resolve(doc, o)))
                        .unwrap_or(default);
                    if end.saturating_sub(start) < MAX_CID_RANGE {
                        for cid in start..=end.max(start) {
                            widths.insert(cid, w);
                        }
                    } else {
                        log::debug!("ignoring /W range {}..={}", start, end);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    Widths::Cid { default, widths }
}
