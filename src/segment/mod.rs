//! Question segmentation.
//!
//! Turns the ordered run stream of a document into labelled questions in a
//! single sequential pass. Segmentation is total: any page sequence yields
//! a (possibly empty) question list.

mod label;
mod marks;

pub use label::LabelMatcher;
pub use marks::MarksExtractor;

use crate::model::{ContentItem, ImageRun, Page, Question, TextRun};

/// Runs smaller than this (in points) never open a question.
pub const DEFAULT_MIN_LABEL_FONT_SIZE: f32 = 9.0;

/// Where a page's images go in the question content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePlacement {
    /// After all of the page's text runs, in image-table order
    #[default]
    PageEnd,
    /// Before the first text run that starts below the image's top edge
    ByPosition,
}

/// Options for segmenting pages into questions.
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// Minimum font size for a run to count as a question boundary
    pub min_label_font_size: f32,

    /// How images are attached to questions
    pub image_placement: ImagePlacement,
}

impl SegmentOptions {
    /// Create new segment options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum label font size.
    pub fn with_min_label_font_size(mut self, size: f32) -> Self {
        self.min_label_font_size = size;
        self
    }

    /// Set the image placement strategy.
    pub fn with_image_placement(mut self, placement: ImagePlacement) -> Self {
        self.image_placement = placement;
        self
    }

    /// Interleave images by vertical position.
    pub fn by_position(mut self) -> Self {
        self.image_placement = ImagePlacement::ByPosition;
        self
    }
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            min_label_font_size: DEFAULT_MIN_LABEL_FONT_SIZE,
            image_placement: ImagePlacement::PageEnd,
        }
    }
}

/// Groups page runs into questions.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    options: SegmentOptions,
    labels: LabelMatcher,
    marks: MarksExtractor,
}

impl Segmenter {
    pub fn new(options: SegmentOptions) -> Self {
        Self {
            options,
            labels: LabelMatcher::new(),
            marks: MarksExtractor::new(),
        }
    }

    pub fn options(&self) -> &SegmentOptions {
        &self.options
    }

    /// Segment pages into questions, borrowing every run from `pages`.
    pub fn segment<'a>(&self, pages: &'a [Page]) -> Vec<Question<'a>> {
        let mut acc = Accumulator::default();

        for page in pages {
            match self.options.image_placement {
                ImagePlacement::PageEnd => {
                    for run in &page.text_runs {
                        self.feed_text(&mut acc, run, page.number);
                    }
                    for image in &page.image_runs {
                        acc.push(ContentItem::Image(image));
                    }
                }
                ImagePlacement::ByPosition => {
                    let mut images: Vec<&ImageRun> = page.image_runs.iter().collect();
                    images.sort_by(|a, b| a.bbox.y.total_cmp(&b.bbox.y));
                    let mut images = images.into_iter().peekable();

                    for run in &page.text_runs {
                        while let Some(image) = images.next_if(|img| img.bbox.y < run.bbox.y) {
                            acc.push(ContentItem::Image(image));
                        }
                        self.feed_text(&mut acc, run, page.number);
                    }
                    for image in images {
                        acc.push(ContentItem::Image(image));
                    }
                }
            }
        }

        acc.finish()
    }

    /// Label and marks when `run` opens a new question.
    pub fn boundary(&self, run: &TextRun) -> Option<(String, Option<u32>)> {
        if run.font_size < self.options.min_label_font_size {
            return None;
        }
        let text = run.text.trim();
        let label = self.labels.find(text)?;
        Some((label, self.marks.extract(text)))
    }

    fn feed_text<'a>(&self, acc: &mut Accumulator<'a>, run: &'a TextRun, page: u32) {
        if let Some((label, marks)) = self.boundary(run) {
            acc.open(label, marks, page);
        }
        acc.push(ContentItem::Text(run));
    }
}

/// Segment pages with the default options.
pub fn segment(pages: &[Page]) -> Vec<Question<'_>> {
    Segmenter::default().segment(pages)
}

/// Fold state threaded through the run stream.
#[derive(Default)]
struct Accumulator<'a> {
    closed: Vec<Question<'a>>,
    current: Option<Question<'a>>,
    discarded: usize,
}

impl<'a> Accumulator<'a> {
    fn open(&mut self, label: String, marks: Option<u32>, page: u32) {
        if let Some(question) = self.current.take() {
            self.closed.push(question);
        }
        let order = self.closed.len() as u32;
        self.current = Some(Question::new(label, order, marks, page));
    }

    fn push(&mut self, item: ContentItem<'a>) {
        match self.current.as_mut() {
            Some(question) => question.content.push(item),
            None => self.discarded += 1,
        }
    }

    fn finish(mut self) -> Vec<Question<'a>> {
        if let Some(question) = self.current.take() {
            self.closed.push(question);
        }
        if self.discarded > 0 {
            log::debug!("dropped {} runs before the first question label", self.discarded);
        }
        self.closed
    }
}
