//! Caller-supplied metadata describing an exam paper.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Earliest exam year accepted.
pub const MIN_YEAR: i32 = 2000;
/// Latest exam year accepted.
pub const MAX_YEAR: i32 = 2030;
/// Highest paper number accepted.
pub const MAX_PAPER_NUMBER: u32 = 3;

fn default_subject() -> String {
    "Economics".to_string()
}

fn default_level() -> String {
    "A-Level".to_string()
}

/// Metadata for an uploaded past paper.
///
/// Accepts both snake_case and the camelCase names used by web clients
/// (`examBoard`, `paperNumber`, `totalMarks`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    /// Exam board (e.g., AQA, Edexcel, OCR)
    #[serde(alias = "examBoard")]
    pub exam_board: String,

    #[serde(default = "default_subject")]
    pub subject: String,

    /// Qualification level (e.g., A-Level, GCSE)
    #[serde(default = "default_level")]
    pub level: String,

    pub year: i32,

    /// Exam session (e.g., June, November)
    pub session: String,

    #[serde(alias = "paperNumber")]
    pub paper_number: u32,

    #[serde(default, alias = "totalMarks")]
    pub total_marks: Option<u32>,

    /// Custom title; generated from the other fields when absent
    #[serde(default)]
    pub title: Option<String>,
}

impl PaperMetadata {
    /// Create metadata with the default subject and level.
    pub fn new(
        exam_board: impl Into<String>,
        year: i32,
        session: impl Into<String>,
        paper_number: u32,
    ) -> Self {
        Self {
            exam_board: exam_board.into(),
            subject: default_subject(),
            level: default_level(),
            year,
            session: session.into(),
            paper_number,
            total_marks: None,
            title: None,
        }
    }

    /// Parse metadata from a JSON string and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let metadata: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidMetadata(format!("invalid JSON: {}", e)))?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Set the total marks.
    pub fn with_total_marks(mut self, marks: u32) -> Self {
        self.total_marks = Some(marks);
        self
    }

    /// Set a custom title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Check field bounds.
    pub fn validate(&self) -> Result<()> {
        if self.exam_board.trim().is_empty() {
            return Err(Error::InvalidMetadata("exam board is required".to_string()));
        }
        if self.session.trim().is_empty() {
            return Err(Error::InvalidMetadata("session is required".to_string()));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            return Err(Error::InvalidMetadata(format!(
                "year {} outside {}..={}",
                self.year, MIN_YEAR, MAX_YEAR
            )));
        }
        if !(1..=MAX_PAPER_NUMBER).contains(&self.paper_number) {
            return Err(Error::InvalidMetadata(format!(
                "paper number {} outside 1..={}",
                self.paper_number, MAX_PAPER_NUMBER
            )));
        }
        Ok(())
    }

    /// The custom title, or one generated from the other fields.
    pub fn display_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!(
                "{} {} {} Paper {} - {} {}",
                self.exam_board,
                self.subject,
                self.level,
                self.paper_number,
                self.session,
                self.year
            ),
        }
    }
}
