//! Segmented questions.

use super::{ImageRun, TextRun};
use serde::Serialize;

/// One item in a question's content list.
///
/// Items borrow from the extracted [`Document`](super::Document); a question
/// never owns or mutates the runs it groups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "UPPERCASE")]
pub enum ContentItem<'a> {
    Text(&'a TextRun),
    Image(&'a ImageRun),
}

impl<'a> ContentItem<'a> {
    /// The text run, if this is a text item.
    pub fn as_text(&self) -> Option<&'a TextRun> {
        match self {
            ContentItem::Text(run) => Some(run),
            ContentItem::Image(_) => None,
        }
    }

    /// The image run, if this is an image item.
    pub fn as_image(&self) -> Option<&'a ImageRun> {
        match self {
            ContentItem::Image(image) => Some(image),
            ContentItem::Text(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentItem::Image(_))
    }
}

/// A logical exam question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question<'a> {
    /// Matched question-number token, e.g. "12", "2(a)", "3(c)(ii)"
    pub label: String,

    /// Zero-based position in the document's question sequence
    pub sequence_order: u32,

    /// Mark allocation found on the label run
    pub marks: Option<u32>,

    /// Page where the label was seen (1-indexed)
    pub page: u32,

    /// Text and image runs in reading order
    pub content: Vec<ContentItem<'a>>,
}

impl<'a> Question<'a> {
    /// Open a question with empty content.
    pub fn new(label: impl Into<String>, sequence_order: u32, marks: Option<u32>, page: u32) -> Self {
        Self {
            label: label.into(),
            sequence_order,
            marks,
            page,
            content: Vec::new(),
        }
    }

    /// Iterate over the question's text runs.
    pub fn text_runs(&self) -> impl Iterator<Item = &'a TextRun> + '_ {
        self.content.iter().filter_map(ContentItem::as_text)
    }

    /// Iterate over the question's image runs.
    pub fn images(&self) -> impl Iterator<Item = &'a ImageRun> + '_ {
        self.content.iter().filter_map(ContentItem::as_image)
    }

    /// Text runs joined with single spaces, each trimmed.
    pub fn plain_text(&self) -> String {
        self.text_runs()
            .map(|run| run.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
