//! Flat, persistable records for a published paper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{BoundingBox, PaperMetadata};

/// A stored paper with its questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Assigned by the caller or the paper store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub exam_board: String,
    pub subject: String,
    pub level: String,
    pub year: i32,
    pub session: String,
    pub paper_number: u32,
    pub total_marks: Option<u32>,
    pub uploaded_at: DateTime<Utc>,
    /// Questions in sequence order
    pub questions: Vec<QuestionRecord>,
}

impl PaperRecord {
    /// Paper-level fields from caller metadata, with no questions yet.
    pub fn from_metadata(metadata: &PaperMetadata, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: metadata.display_title(),
            exam_board: metadata.exam_board.clone(),
            subject: metadata.subject.clone(),
            level: metadata.level.clone(),
            year: metadata.year,
            session: metadata.session.clone(),
            paper_number: metadata.paper_number,
            total_marks: metadata.total_marks,
            uploaded_at,
            questions: Vec::new(),
        }
    }

    /// Total content items across all questions.
    pub fn content_count(&self) -> usize {
        self.questions.iter().map(|q| q.content.len()).sum()
    }
}

/// A stored question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Question label, e.g. "3(b)"
    pub question_number: String,
    pub sequence_order: u32,
    pub marks: Option<u32>,
    pub page: u32,
    pub content: Vec<ContentRecord>,
}

/// One text or image item of a stored question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Position within the question, from 0
    pub sequence_order: u32,
    #[serde(flatten)]
    pub body: ContentBody,
}

/// Content payload, tagged by `content_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content_type", rename_all = "UPPERCASE")]
pub enum ContentBody {
    Text {
        text: String,
        font_size: f32,
        font_family: String,
        is_bold: bool,
        is_italic: bool,
        bbox: BoundingBox,
    },
    Image {
        /// Reference returned by the blob store
        image_url: String,
        /// Pixel width
        image_width: u32,
        /// Pixel height
        image_height: u32,
        bbox: BoundingBox,
        alt_text: String,
    },
}

impl ContentBody {
    pub fn is_image(&self) -> bool {
        matches!(self, ContentBody::Image { .. })
    }
}
