//! Text and image runs: the finest-grained content units on a page.

use serde::{Deserialize, Serialize};

/// Font family used when a run carries no font name.
pub const UNKNOWN_FONT: &str = "unknown";

/// Font size used when the content stream never sets one.
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Round a coordinate or size to 2 decimal places.
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Axis-aligned rectangle in page units, origin at the top-left corner of
/// the page and y growing downwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Create a bounding box, rounding every component to 2 decimals.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x: round2(x),
            y: round2(y),
            width: round2(width),
            height: round2(height),
        }
    }

    /// Build from two corners in any order.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let (left, right) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self::new(left, top, right - left, bottom - top)
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// A contiguous span of text sharing one font, size, colour and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Text content, exactly as extracted (not trimmed)
    pub text: String,
    /// Font family name
    pub font_family: String,
    /// Font size in points, rounded to 2 decimals
    pub font_size: f32,
    pub is_bold: bool,
    pub is_italic: bool,
    /// Fill colour as packed sRGB (`0xRRGGBB`); not interpreted further
    pub color: u32,
    /// Position on the page
    pub bbox: BoundingBox,
}

impl TextRun {
    /// Create a run with default styling.
    pub fn new(text: impl Into<String>, font_size: f32) -> Self {
        Self {
            text: text.into(),
            font_family: UNKNOWN_FONT.to_string(),
            font_size: round2(font_size),
            is_bold: false,
            is_italic: false,
            color: 0,
            bbox: BoundingBox::default(),
        }
    }

    /// Set the font family; an empty name falls back to [`UNKNOWN_FONT`].
    pub fn with_font(mut self, family: impl Into<String>) -> Self {
        let family = family.into();
        self.font_family = if family.is_empty() {
            UNKNOWN_FONT.to_string()
        } else {
            family
        };
        self
    }

    /// Set bold and italic flags.
    pub fn with_style(mut self, is_bold: bool, is_italic: bool) -> Self {
        self.is_bold = is_bold;
        self.is_italic = is_italic;
        self
    }

    /// Set the raw colour value.
    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    /// Set the bounding box.
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = bbox;
        self
    }
}

/// An embedded raster image placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRun {
    /// Encoded image bytes
    #[serde(skip_serializing, default)]
    pub data: Vec<u8>,
    /// File extension of `data` (e.g. "jpeg", "png")
    pub format: String,
    /// Width in pixels, decoded from `data`
    pub width: u32,
    /// Height in pixels, decoded from `data`
    pub height: u32,
    /// Placement rectangle on the page
    pub bbox: BoundingBox,
    /// Position among the page's image references
    pub index: usize,
    /// Owning page (1-indexed)
    pub page: u32,
}

impl ImageRun {
    /// Size of the encoded image in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// MIME type matching `format`.
    pub fn mime_type(&self) -> String {
        format!("image/{}", self.format)
    }
}
