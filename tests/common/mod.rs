//! Synthetic PDF fixtures built with lopdf.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

/// One page of a synthetic document.
pub struct TestPage {
    content: Object,
    images: Vec<(&'static str, Stream)>,
    forms: Vec<(&'static str, TestPage)>,
}

impl TestPage {
    /// A page whose content stream is `content`.
    pub fn new(content: &str) -> Self {
        Self {
            content: Object::Stream(Stream::new(dictionary! {}, content.as_bytes().to_vec())),
            images: Vec::new(),
            forms: Vec::new(),
        }
    }

    /// A page whose /Contents entry is not a stream.
    pub fn broken() -> Self {
        Self {
            content: Object::Integer(5),
            images: Vec::new(),
            forms: Vec::new(),
        }
    }

    /// Register an image XObject under `name` in the page resources.
    pub fn with_image(mut self, name: &'static str, stream: Stream) -> Self {
        self.images.push((name, stream));
        self
    }

    /// Register a form XObject under `name`. The form's content and images
    /// come from `form`; it shares the page fonts.
    pub fn with_form(mut self, name: &'static str, form: TestPage) -> Self {
        self.forms.push((name, form));
        self
    }
}

/// Add a form's stream and its own resources to `doc`.
fn add_form(doc: &mut Document, form: TestPage, fonts: &lopdf::Dictionary) -> lopdf::ObjectId {
    let content = match form.content {
        Object::Stream(stream) => stream.content,
        _ => Vec::new(),
    };
    let xobjects = add_xobjects(doc, form.images, form.forms, fonts);
    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => fonts.clone(),
                "XObject" => xobjects,
            },
        },
        content,
    ))
}

fn add_xobjects(
    doc: &mut Document,
    images: Vec<(&'static str, Stream)>,
    forms: Vec<(&'static str, TestPage)>,
    fonts: &lopdf::Dictionary,
) -> lopdf::Dictionary {
    let mut xobjects = lopdf::Dictionary::new();
    for (name, stream) in images {
        xobjects.set(name, doc.add_object(stream));
    }
    for (name, form) in forms {
        let id = add_form(doc, form, fonts);
        xobjects.set(name, id);
    }
    xobjects
}

/// An uncompressed 8-bit RGB image stream.
pub fn rgb_image(width: i64, height: i64) -> Stream {
    let samples = (width * height * 3) as usize;
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        (0..samples).map(|i| (i * 37 % 256) as u8).collect(),
    )
}

/// A DCT image stream whose payload is not a JPEG.
pub fn corrupt_jpeg() -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 4,
            "Height" => 4,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        b"definitely not a jpeg".to_vec(),
    )
}

/// Serialise `pages` into a Letter-sized PDF with Helvetica as /F1 and
/// Helvetica-Bold as /F2.
pub fn build_pdf(pages: Vec<TestPage>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });

    let fonts = dictionary! {
        "F1" => regular,
        "F2" => bold,
    };

    let mut kids = Vec::new();
    for page in pages {
        let content = match page.content {
            Object::Stream(stream) => Object::Reference(doc.add_object(stream)),
            other => other,
        };

        let xobjects = add_xobjects(&mut doc, page.images, page.forms, &fonts);

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content,
            "Resources" => dictionary! {
                "Font" => fonts.clone(),
                "XObject" => xobjects,
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Economics Paper 1"),
        "Producer" => Object::string_literal("paperseg tests"),
        "CreationDate" => Object::string_literal("D:20240515090000Z"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("in-memory save");
    buffer
}

/// The two-page economics paper used across the integration tests.
///
/// Page 1 holds question 1 over two lines plus one 2x2 image drawn at
/// (100, 300) in PDF space, 200x150 points. Page 2 holds question 2.
pub fn economics_paper() -> Vec<u8> {
    build_pdf(vec![
        TestPage::new(
            "BT /F1 11 Tf 72 700 Td (1 Define GDP. [2 marks]) Tj \
             0 -20 Td (Explain your answer.) Tj ET \
             q 200 0 0 150 100 300 cm /Im0 Do Q",
        )
        .with_image("Im0", rgb_image(2, 2)),
        TestPage::new("BT /F1 11 Tf 72 700 Td (2 Explain scarcity.) Tj ET"),
    ])
}
