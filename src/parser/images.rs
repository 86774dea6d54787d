//! Embedded image extraction.
//!
//! Image XObjects come out as self-describing files: DCT streams pass
//! through as JPEG, raw samples are re-encoded as PNG. The pixel size is
//! always probed from the produced bytes.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::model::BoundingBox;

use super::content::{XObjectKey, MAX_FORM_DEPTH};
use super::objects::{dict_get, dict_get_dict, get_name, get_number, resolve, stream_bytes};

/// Image codecs that are neither passed through nor decoded here.
const UNSUPPORTED_FILTERS: [&str; 4] = ["DCTDecode", "JPXDecode", "JBIG2Decode", "CCITTFaxDecode"];

/// One entry of a page's image-reference table.
#[derive(Debug)]
pub struct ImageEntry<'a> {
    /// Position in the table
    pub index: usize,
    pub key: XObjectKey,
    pub stream: &'a Stream,
}

impl ImageEntry<'_> {
    /// First recorded placement of the image.
    pub fn placement(&self, placements: &HashMap<XObjectKey, BoundingBox>) -> Option<BoundingBox> {
        placements.get(&self.key).copied()
    }
}

/// An image ready to be attached to a page.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: &'static str,
    pub width: u32,
    pub height: u32,
}

/// List the image XObjects of a page's resources in table order.
///
/// Images used by form XObjects follow their form's position in the
/// table. An image reachable under several names or forms is listed once.
pub fn image_table<'a>(doc: &'a LopdfDocument, resources: Option<&'a Dictionary>) -> Vec<ImageEntry<'a>> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    collect_images(doc, resources, 0, &mut entries, &mut seen);
    entries
}

fn collect_images<'a>(
    doc: &'a LopdfDocument,
    resources: Option<&'a Dictionary>,
    depth: usize,
    entries: &mut Vec<ImageEntry<'a>>,
    seen: &mut HashSet<ObjectId>,
) {
    let Some(xobjects) = resources.and_then(|r| dict_get_dict(doc, r, b"XObject")) else {
        return;
    };

    for (name, obj) in xobjects.iter() {
        let Object::Stream(stream) = resolve(doc, obj) else {
            continue;
        };
        let id = obj.as_reference().ok();
        if let Some(id) = id {
            if !seen.insert(id) {
                continue;
            }
        }

        match dict_get(doc, &stream.dict, b"Subtype").and_then(get_name) {
            Some("Image") => {
                let key = match id {
                    Some(id) => XObjectKey::Id(id),
                    None if depth == 0 => XObjectKey::Name(name.clone()),
                    None => continue,
                };
                entries.push(ImageEntry {
                    index: entries.len(),
                    key,
                    stream,
                });
            }
            // A form without its own resources shares the ones already walked.
            Some("Form") if depth < MAX_FORM_DEPTH => {
                if let Some(inner) = dict_get_dict(doc, &stream.dict, b"Resources") {
                    collect_images(doc, Some(inner), depth + 1, entries, seen);
                }
            }
            _ => {}
        }
    }
}

/// Turn an image XObject into encoded bytes and probe its pixel size.
pub fn encode_image(doc: &LopdfDocument, stream: &Stream) -> Result<EncodedImage, String> {
    let filters = stream_filters(doc, &stream.dict);

    let (data, format) = match filters.as_slice() {
        [only] if only == "DCTDecode" => (stream.content.clone(), "jpeg"),
        _ if filters.iter().any(|f| UNSUPPORTED_FILTERS.contains(&f.as_str())) => {
            return Err(format!("unsupported filter chain {:?}", filters));
        }
        _ => (encode_samples(doc, stream)?, "png"),
    };

    let (width, height) = probe_dimensions(&data)?;
    Ok(EncodedImage {
        data,
        format,
        width,
        height,
    })
}

/// Decode the pixel size of an encoded image.
pub fn probe_dimensions(data: &[u8]) -> Result<(u32, u32), String> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())
}

fn stream_filters(doc: &LopdfDocument, dict: &Dictionary) -> Vec<String> {
    match dict_get(doc, dict, b"Filter") {
        Some(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| get_name(resolve(doc, o)))
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Colour model of raw image samples.
#[derive(Debug, Clone, PartialEq)]
enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// Palette of packed colour components in the base model
    Indexed { base: Box<ColorModel>, palette: Vec<u8> },
}

impl ColorModel {
    fn components(&self) -> usize {
        match self {
            ColorModel::Gray | ColorModel::Indexed { .. } => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }
}

fn color_model(doc: &LopdfDocument, obj: &Object) -> Result<ColorModel, String> {
    match resolve(doc, obj) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(ColorModel::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(ColorModel::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorModel::Cmyk),
            other => Err(format!(
                "unsupported colour space {}",
                String::from_utf8_lossy(other)
            )),
        },
        Object::Array(items) => {
            let family = items.first().and_then(|o| get_name(resolve(doc, o)));
            match family {
                Some("ICCBased") => {
                    let n = items
                        .get(1)
                        .and_then(|o| match resolve(doc, o) {
                            Object::Stream(s) => dict_get(doc, &s.dict, b"N").and_then(get_number),
                            _ => None,
                        })
                        .unwrap_or(3.0);
                    match n as u32 {
                        1 => Ok(ColorModel::Gray),
                        3 => Ok(ColorModel::Rgb),
                        4 => Ok(ColorModel::Cmyk),
                        other => Err(format!("unsupported ICC component count {}", other)),
                    }
                }
                Some("CalGray") => Ok(ColorModel::Gray),
                Some("CalRGB") => Ok(ColorModel::Rgb),
                Some("Indexed") | Some("I") => {
                    let base = items
                        .get(1)
                        .ok_or("indexed colour space without base")?;
                    let base = color_model(doc, base)?;
                    if matches!(base, ColorModel::Indexed { .. }) {
                        return Err("nested indexed colour space".to_string());
                    }
                    let palette = match items.get(3).map(|o| resolve(doc, o)) {
                        Some(Object::String(bytes, _)) => bytes.clone(),
                        Some(Object::Stream(s)) => stream_bytes(s).map_err(|e| e.to_string())?,
                        _ => return Err("indexed colour space without lookup table".to_string()),
                    };
                    Ok(ColorModel::Indexed {
                        base: Box::new(base),
                        palette,
                    })
                }
                Some(other) => Err(format!("unsupported colour space {}", other)),
                None => Err("empty colour space array".to_string()),
            }
        }
        _ => Err("missing colour space".to_string()),
    }
}

/// Encode raw (possibly Flate/LZW compressed) samples as PNG.
fn encode_samples(doc: &LopdfDocument, stream: &Stream) -> Result<Vec<u8>, String> {
    let dict = &stream.dict;
    let dimension = |key: &[u8]| {
        dict_get(doc, dict, key)
            .and_then(|o| o.as_i64().ok())
            .filter(|v| *v > 0)
            .map(|v| v as u32)
            .ok_or_else(|| format!("missing {}", String::from_utf8_lossy(key)))
    };
    let width = dimension(b"Width")?;
    let height = dimension(b"Height")?;

    let is_mask = matches!(dict_get(doc, dict, b"ImageMask"), Some(Object::Boolean(true)));
    let model = if is_mask {
        ColorModel::Gray
    } else {
        let space = dict
            .get(b"ColorSpace")
            .map_err(|_| "missing colour space".to_string())?;
        color_model(doc, space)?
    };
    let bits = if is_mask {
        1
    } else {
        dict_get(doc, dict, b"BitsPerComponent")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8)
    };

    let supported = match &model {
        ColorModel::Gray => matches!(bits, 1 | 2 | 4 | 8),
        ColorModel::Indexed { .. } => matches!(bits, 1 | 2 | 4 | 8),
        ColorModel::Rgb | ColorModel::Cmyk => bits == 8,
    };
    if !supported {
        return Err(format!("unsupported {} bits per component", bits));
    }

    let raw = stream_bytes(stream).map_err(|e| e.to_string())?;
    let samples = unpack_samples(&raw, width, height, model.components(), bits as u8)?;

    let inverted = decode_inverted(doc, dict);
    let image = match model {
        ColorModel::Gray => {
            let max = (1u32 << bits) - 1;
            let pixels: Vec<u8> = samples
                .iter()
                .map(|&s| {
                    let v = (u32::from(s) * 255 / max) as u8;
                    if inverted {
                        255 - v
                    } else {
                        v
                    }
                })
                .collect();
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        ColorModel::Rgb => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        ColorModel::Cmyk => {
            let pixels = samples.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        ColorModel::Indexed { base, palette } => {
            let n = base.components();
            let mut pixels = Vec::with_capacity(samples.len() * 3);
            for &index in &samples {
                let start = usize::from(index) * n;
                let entry = palette
                    .get(start..start + n)
                    .ok_or_else(|| format!("palette index {} out of range", index))?;
                match *base {
                    ColorModel::Gray => pixels.extend_from_slice(&[entry[0]; 3]),
                    ColorModel::Cmyk => pixels.extend_from_slice(&cmyk_to_rgb(entry)),
                    _ => pixels.extend_from_slice(entry),
                }
            }
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
    }
    .ok_or("sample buffer does not match image size")?;

    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(out.into_inner())
}

/// Expand packed samples to one byte per component; rows are byte aligned.
fn unpack_samples(
    raw: &[u8],
    width: u32,
    height: u32,
    components: usize,
    bits: u8,
) -> Result<Vec<u8>, String> {
    let per_row = width as usize * components;
    let row_bytes = (per_row * usize::from(bits)).div_ceil(8);
    let needed = row_bytes * height as usize;
    if raw.len() < needed {
        return Err(format!(
            "image data too short: {} bytes, expected {}",
            raw.len(),
            needed
        ));
    }

    if bits == 8 {
        return Ok(raw[..needed].to_vec());
    }

    let mask = (1u16 << bits) - 1;
    let mut samples = Vec::with_capacity(per_row * height as usize);
    for row in raw[..needed].chunks_exact(row_bytes) {
        for i in 0..per_row {
            let bit = i * usize::from(bits);
            let byte = row[bit / 8];
            let shift = 8 - usize::from(bits) - bit % 8;
            samples.push(((u16::from(byte) >> shift) & mask) as u8);
        }
    }
    Ok(samples)
}

/// A `/Decode [1 0]` array flips single-component samples.
fn decode_inverted(doc: &LopdfDocument, dict: &Dictionary) -> bool {
    let Some(decode) = dict_get(doc, dict, b"Decode").and_then(|o| o.as_array().ok()) else {
        return false;
    };
    let values: Vec<f32> = decode.iter().filter_map(|o| get_number(resolve(doc, o))).collect();
    matches!(values.as_slice(), [lo, hi] if lo > hi)
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - u32::from(cmyk[3]);
    let channel = |c: u8| ((255 - u32::from(c)) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}
