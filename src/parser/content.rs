//! Content stream interpretation.
//!
//! Walks a page's operators once, tracking the graphics and text state, and
//! produces style-merged [`TextRun`]s plus the placement of each XObject
//! the page paints, including those painted from inside forms.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::model::{BoundingBox, TextRun, DEFAULT_FONT_SIZE};

use super::fonts::{page_fonts, FontInfo, FLAG_BOLD, FLAG_ITALIC, FLAG_SUPERSCRIPT};
use super::objects::{dict_get, dict_get_dict, get_name, get_number, resolve, stream_bytes, PageBox};

/// Nested form XObjects deeper than this are not entered.
pub const MAX_FORM_DEPTH: usize = 8;

/// TJ adjustments and positioning gaps wider than this fraction of the
/// font size read as a word break.
const SPACE_GAP_RATIO: f32 = 0.15;

/// Largest gap, as a fraction of the font size, that still joins two
/// fragments into one run.
const MERGE_GAP_RATIO: f32 = 0.6;

/// Tolerated baseline drift, as a fraction of the font size.
const BASELINE_TOLERANCE: f32 = 0.1;

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Build from six numeric operands.
    fn from_operands(operands: &[Object]) -> Option<Self> {
        let n = numbers(operands);
        match n.as_slice() {
            [a, b, c, d, e, f, ..] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// `self` applied first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn transform(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed unit y vector.
    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Graphics state saved by `q` and restored by `Q`. Text state parameters
/// are part of it.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: u32,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            fill: 0,
            font: None,
            font_size: DEFAULT_FONT_SIZE,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Shown text, positioned in top-left page coordinates.
#[derive(Debug, Clone)]
struct Fragment {
    text: String,
    family: String,
    size: f32,
    flags: u32,
    color: u32,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    baseline: f32,
    start_x: f32,
    end_x: f32,
}

impl Fragment {
    fn same_style(&self, other: &Fragment) -> bool {
        self.family == other.family
            && (self.size - other.size).abs() < 0.01
            && self.flags == other.flags
            && self.color == other.color
    }

    fn same_line(&self, other: &Fragment) -> bool {
        (self.baseline - other.baseline).abs() <= self.size.max(1.0) * BASELINE_TOLERANCE
    }

    fn absorb(&mut self, other: Fragment, gap: f32) {
        let ends_blank = self.text.ends_with(char::is_whitespace);
        let starts_blank = other.text.starts_with(char::is_whitespace);
        if gap > self.size * SPACE_GAP_RATIO && !ends_blank && !starts_blank {
            self.text.push(' ');
        }
        self.text.push_str(&other.text);
        self.x0 = self.x0.min(other.x0);
        self.y0 = self.y0.min(other.y0);
        self.x1 = self.x1.max(other.x1);
        self.y1 = self.y1.max(other.y1);
        self.end_x = other.end_x;
    }

    fn into_run(self) -> TextRun {
        TextRun::new(self.text, self.size)
            .with_font(self.family)
            .with_style(self.flags & FLAG_BOLD != 0, self.flags & FLAG_ITALIC != 0)
            .with_color(self.color)
            .with_bbox(BoundingBox::from_corners(self.x0, self.y0, self.x1, self.y1))
    }
}

/// Identity of a painted XObject.
///
/// Indirect objects are matched by id wherever they are painted. A direct
/// stream in the page resources can only be matched by its name there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum XObjectKey {
    Id(ObjectId),
    Name(Vec<u8>),
}

/// Result of interpreting one page.
#[derive(Debug, Default)]
pub struct PageContent {
    /// Text runs in content-stream order
    pub runs: Vec<TextRun>,
    /// First placement of each painted XObject, in page space
    pub placements: HashMap<XObjectKey, BoundingBox>,
}

/// Interpreter for one page's content streams.
pub struct ContentInterpreter<'a> {
    doc: &'a LopdfDocument,
    page_box: PageBox,
    runs: Vec<TextRun>,
    pending: Option<Fragment>,
    placements: HashMap<XObjectKey, BoundingBox>,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(doc: &'a LopdfDocument, page_box: PageBox) -> Self {
        Self {
            doc,
            page_box,
            runs: Vec::new(),
            pending: None,
            placements: HashMap::new(),
        }
    }

    /// Interpret decoded page content against the page resources.
    pub fn run(mut self, content: &[u8], resources: Option<&'a Dictionary>) -> Result<PageContent> {
        let operations = Content::decode(content)
            .map_err(|e| Error::MalformedDocument(format!("content stream: {}", e)))?
            .operations;
        self.interpret(&operations, resources, GraphicsState::new(Matrix::IDENTITY), 0);
        self.flush();
        Ok(PageContent {
            runs: self.runs,
            placements: self.placements,
        })
    }

    fn interpret(
        &mut self,
        operations: &[lopdf::content::Operation],
        resources: Option<&'a Dictionary>,
        initial: GraphicsState,
        depth: usize,
    ) {
        let fonts = page_fonts(self.doc, resources);
        let fallback = FontInfo::fallback();
        let mut state = initial;
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut text_matrix = Matrix::IDENTITY;
        let mut line_matrix = Matrix::IDENTITY;

        for op in operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.ctm = m.multiply(&state.ctm);
                    }
                }
                "BT" => {
                    text_matrix = Matrix::IDENTITY;
                    line_matrix = Matrix::IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    if let [Object::Name(name), size, ..] = operands {
                        state.font = Some(name.clone());
                        state.font_size = get_number(size).unwrap_or(DEFAULT_FONT_SIZE);
                    }
                }
                "Tc" => set_number(operands, &mut state.char_spacing),
                "Tw" => set_number(operands, &mut state.word_spacing),
                "Tz" => {
                    if let Some(scale) = operands.first().and_then(get_number) {
                        state.horizontal_scale = scale / 100.0;
                    }
                }
                "TL" => set_number(operands, &mut state.leading),
                "Ts" => set_number(operands, &mut state.rise),
                "Td" | "TD" => {
                    if let [tx, ty] = numbers(operands).as_slice() {
                        if op.operator == "TD" {
                            state.leading = -ty;
                        }
                        line_matrix = Matrix::translate(*tx, *ty).multiply(&line_matrix);
                        text_matrix = line_matrix;
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        line_matrix = m;
                        text_matrix = m;
                    }
                }
                "T*" => {
                    line_matrix = Matrix::translate(0.0, -state.leading).multiply(&line_matrix);
                    text_matrix = line_matrix;
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let font = current_font(&fonts, &fallback, &state);
                        self.show(font, &state, &mut text_matrix, bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let font = current_font(&fonts, &fallback, &state);
                        for item in items {
                            match item {
                                Object::String(bytes, _) => {
                                    self.show(font, &state, &mut text_matrix, bytes)
                                }
                                other => {
                                    if let Some(n) = get_number(other) {
                                        let tx = -n / 1000.0
                                            * state.font_size
                                            * state.horizontal_scale;
                                        text_matrix =
                                            Matrix::translate(tx, 0.0).multiply(&text_matrix);
                                    }
                                }
                            }
                        }
                    }
                }
                "'" | "\"" => {
                    let text_index = if op.operator == "\"" {
                        if let [aw, ac, ..] = operands {
                            state.word_spacing = get_number(aw).unwrap_or(state.word_spacing);
                            state.char_spacing = get_number(ac).unwrap_or(state.char_spacing);
                        }
                        2
                    } else {
                        0
                    };
                    line_matrix = Matrix::translate(0.0, -state.leading).multiply(&line_matrix);
                    text_matrix = line_matrix;
                    if let Some(Object::String(bytes, _)) = operands.get(text_index) {
                        let font = current_font(&fonts, &fallback, &state);
                        self.show(font, &state, &mut text_matrix, bytes);
                    }
                }
                "g" | "rg" | "k" | "sc" | "scn" => {
                    if let Some(color) = pack_color(&numbers(operands)) {
                        state.fill = color;
                    }
                }
                "cs" => state.fill = 0,
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.paint_xobject(name, resources, &state, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn paint_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        state: &GraphicsState,
        depth: usize,
    ) {
        let doc = self.doc;
        let Some(xobjects) = resources.and_then(|r| dict_get_dict(doc, r, b"XObject")) else {
            return;
        };
        let Ok(entry) = xobjects.get(name) else {
            return;
        };

        let key = match entry {
            Object::Reference(id) => Some(XObjectKey::Id(*id)),
            _ if depth == 0 => Some(XObjectKey::Name(name.to_vec())),
            _ => None,
        };
        if let Some(key) = key {
            let (x0, y0, x1, y1) = self.unit_square_bounds(&state.ctm);
            self.placements
                .entry(key)
                .or_insert_with(|| BoundingBox::from_corners(x0, y0, x1, y1));
        }

        let Object::Stream(form) = resolve(doc, entry) else {
            return;
        };
        if dict_get(doc, &form.dict, b"Subtype").and_then(get_name) != Some("Form") {
            return;
        }
        if depth >= MAX_FORM_DEPTH {
            log::debug!("form XObject nesting too deep, skipping");
            return;
        }

        let form_matrix = dict_get(doc, &form.dict, b"Matrix")
            .and_then(|m| m.as_array().ok())
            .and_then(|arr| {
                let resolved: Vec<Object> = arr.iter().map(|o| resolve(doc, o).clone()).collect();
                Matrix::from_operands(&resolved)
            })
            .unwrap_or(Matrix::IDENTITY);
        let form_resources = dict_get_dict(doc, &form.dict, b"Resources").or(resources);

        let decoded = stream_bytes(form).and_then(|bytes| {
            Content::decode(&bytes)
                .map_err(|e| Error::MalformedDocument(format!("form content: {}", e)))
        });
        // Forms inherit the graphics state in effect at the Do.
        let mut inner = state.clone();
        inner.ctm = form_matrix.multiply(&state.ctm);
        match decoded {
            Ok(content) => self.interpret(&content.operations, form_resources, inner, depth + 1),
            Err(e) => log::debug!("skipping unreadable form XObject: {}", e),
        }
    }

    /// Show one string, advancing the text matrix by its glyph widths.
    fn show(&mut self, font: &FontInfo<'_>, state: &GraphicsState, text_matrix: &mut Matrix, bytes: &[u8]) {
        let codes = font.codes(bytes);
        if codes.is_empty() {
            return;
        }

        let fs = state.font_size;
        let mut advance = 0.0;
        for &code in &codes {
            let mut glyph = font.width(code) / 1000.0 * fs + state.char_spacing;
            if font.is_word_space(code) {
                glyph += state.word_spacing;
            }
            advance += glyph * state.horizontal_scale;
        }

        let text = font.decode(bytes);
        let render = text_matrix.multiply(&state.ctm);
        let size = (fs * render.vertical_scale()).abs();

        let bottom = state.rise + font.descent / 1000.0 * fs;
        let top = state.rise + font.ascent / 1000.0 * fs;
        let corners = [
            render.transform(0.0, bottom),
            render.transform(advance, bottom),
            render.transform(0.0, top),
            render.transform(advance, top),
        ];
        let (mut x0, mut y0, mut x1, mut y1) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for (x, y) in corners {
            let (x, y) = self.page_box.to_top_left(x, y);
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }

        let (start_x, baseline) = {
            let (x, y) = render.transform(0.0, 0.0);
            self.page_box.to_top_left(x, y)
        };
        let (end_x, _) = {
            let (x, y) = render.transform(advance, 0.0);
            self.page_box.to_top_left(x, y)
        };

        *text_matrix = Matrix::translate(advance, 0.0).multiply(text_matrix);

        let mut flags = font.flags;
        if state.rise > 0.0 {
            flags |= FLAG_SUPERSCRIPT;
        }

        self.push_fragment(Fragment {
            text,
            family: font.family.clone(),
            size,
            flags,
            color: state.fill,
            x0,
            y0,
            x1,
            y1,
            baseline,
            start_x,
            end_x,
        });
    }

    fn push_fragment(&mut self, fragment: Fragment) {
        if fragment.text.is_empty() {
            return;
        }

        let blank = fragment.text.trim().is_empty();
        match self.pending.as_mut() {
            Some(pending) if blank => {
                // Whitespace only extends a run on the same line.
                if pending.same_line(&fragment) {
                    pending.text.push_str(&fragment.text);
                    pending.end_x = pending.end_x.max(fragment.end_x);
                }
            }
            Some(pending) => {
                let gap = fragment.start_x - pending.end_x;
                let limit = pending.size * MERGE_GAP_RATIO;
                if pending.same_style(&fragment)
                    && pending.same_line(&fragment)
                    && gap >= -limit
                    && gap <= limit
                {
                    pending.absorb(fragment, gap);
                } else {
                    self.flush();
                    self.pending = Some(fragment);
                }
            }
            None if blank => {}
            None => self.pending = Some(fragment),
        }
    }

    fn flush(&mut self) {
        if let Some(fragment) = self.pending.take() {
            self.runs.push(fragment.into_run());
        }
    }

    fn unit_square_bounds(&self, ctm: &Matrix) -> (f32, f32, f32, f32) {
        let (mut x0, mut y0, mut x1, mut y1) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for (ux, uy) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
            let (x, y) = ctm.transform(ux, uy);
            let (x, y) = self.page_box.to_top_left(x, y);
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        (x0, y0, x1, y1)
    }
}

fn current_font<'f, 'a>(
    fonts: &'f HashMap<Vec<u8>, FontInfo<'a>>,
    fallback: &'f FontInfo<'a>,
    state: &GraphicsState,
) -> &'f FontInfo<'a> {
    state
        .font
        .as_ref()
        .and_then(|name| fonts.get(name))
        .unwrap_or(fallback)
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(get_number).collect()
}

fn set_number(operands: &[Object], target: &mut f32) {
    if let Some(value) = operands.first().and_then(get_number) {
        *target = value;
    }
}

/// Pack a gray, RGB or CMYK colour into `0xRRGGBB`.
fn pack_color(components: &[f32]) -> Option<u32> {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    let (r, g, b) = match *components {
        [gray] => (gray, gray, gray),
        [r, g, b] => (r, g, b),
        [c, m, y, k] => (
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        ),
        _ => return None,
    };
    Some(channel(r) << 16 | channel(g) << 8 | channel(b))
}
