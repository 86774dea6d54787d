//! Small helpers over lopdf objects shared by the text and image passes.

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Page box (CropBox, else MediaBox) in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PageBox {
    /// US Letter, used when a page declares no usable box.
    pub const LETTER: PageBox = PageBox {
        x0: 0.0,
        y0: 0.0,
        x1: 612.0,
        y1: 792.0,
    };

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Map a user-space point to top-left page coordinates.
    pub fn to_top_left(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.x0, self.y1 - y)
    }
}

/// Follow a reference to the object it names; other objects pass through.
pub fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Resolve a dictionary entry, following one level of indirection.
pub fn dict_get<'a>(doc: &'a LopdfDocument, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|obj| resolve(doc, obj))
}

/// Resolve a dictionary entry that should be a dictionary.
pub fn dict_get_dict<'a>(
    doc: &'a LopdfDocument,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    match dict_get(doc, dict, key)? {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

/// Extract a number from a PDF object.
pub fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Name object as a UTF-8 string.
pub fn get_name(obj: &Object) -> Option<&str> {
    match obj {
        Object::Name(name) => std::str::from_utf8(name).ok(),
        _ => None,
    }
}

/// Stream bytes with all filters removed.
///
/// Unfiltered streams are returned as stored.
pub fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    stream
        .decompressed_content()
        .map_err(|e| Error::MalformedDocument(format!("stream decode failed: {}", e)))
}

/// Look up a page attribute, walking up the page tree for inheritable keys.
pub fn inherited<'a>(doc: &'a LopdfDocument, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Bounded walk; malformed trees can contain cycles.
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Page resources dictionary (possibly inherited).
pub fn page_resources(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    match inherited(doc, page_id, b"Resources")? {
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

/// Visible page box: CropBox when present, else MediaBox.
pub fn page_box(doc: &LopdfDocument, page_id: ObjectId) -> PageBox {
    inherited(doc, page_id, b"CropBox")
        .and_then(|obj| rect_from_object(doc, obj))
        .or_else(|| inherited(doc, page_id, b"MediaBox").and_then(|obj| rect_from_object(doc, obj)))
        .unwrap_or(PageBox::LETTER)
}

fn rect_from_object(doc: &LopdfDocument, obj: &Object) -> Option<PageBox> {
    let array = obj.as_array().ok()?;
    if array.len() < 4 {
        return None;
    }
    let mut values = [0.0f32; 4];
    for (slot, item) in values.iter_mut().zip(array.iter()) {
        *slot = get_number(resolve(doc, item))?;
    }
    let rect = PageBox {
        x0: values[0].min(values[2]),
        y0: values[1].min(values[3]),
        x1: values[0].max(values[2]),
        y1: values[1].max(values[3]),
    };
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return None;
    }
    Some(rect)
}

/// Concatenated, decompressed content streams of a page.
pub fn page_content(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::MalformedDocument(e.to_string()))?;

    let contents = match page_dict.get(b"Contents") {
        Ok(contents) => contents,
        // A page without content is blank, not broken.
        Err(_) => return Ok(Vec::new()),
    };

    match resolve(doc, contents) {
        Object::Stream(s) => stream_bytes(s),
        Object::Array(arr) => {
            let mut content = Vec::new();
            for obj in arr {
                if let Object::Stream(s) = resolve(doc, obj) {
                    content.extend_from_slice(&stream_bytes(s)?);
                    content.push(b'\n');
                }
            }
            Ok(content)
        }
        _ => Err(Error::MalformedDocument(
            "invalid page content stream".to_string(),
        )),
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8, else Latin-1).
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}
