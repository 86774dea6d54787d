//! In-memory paper storage.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::{Error, Result};

use super::{PaperRecord, PaperStore};

/// Keeps papers in a map; useful for tests and single-process tools.
#[derive(Debug, Default)]
pub struct MemoryPaperStore {
    papers: Mutex<HashMap<String, PaperRecord>>,
}

impl MemoryPaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored papers.
    pub fn len(&self) -> usize {
        self.papers.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl PaperStore for MemoryPaperStore {
    fn insert_paper(&self, mut paper: PaperRecord) -> Result<String> {
        let id = paper.id.get_or_insert_with(new_id).clone();
        for question in &mut paper.questions {
            question.id.get_or_insert_with(new_id);
            for content in &mut question.content {
                content.id.get_or_insert_with(new_id);
            }
        }

        let mut papers = self
            .papers
            .lock()
            .map_err(|_| Error::Storage("paper store lock poisoned".to_string()))?;
        if papers.contains_key(&id) {
            return Err(Error::Storage(format!("paper {} already exists", id)));
        }
        papers.insert(id.clone(), paper);
        Ok(id)
    }

    fn get_paper(&self, id: &str) -> Result<Option<PaperRecord>> {
        let papers = self
            .papers
            .lock()
            .map_err(|_| Error::Storage("paper store lock poisoned".to_string()))?;
        Ok(papers.get(id).cloned().map(|mut paper| {
            paper.questions.sort_by_key(|q| q.sequence_order);
            for question in &mut paper.questions {
                question.content.sort_by_key(|c| c.sequence_order);
            }
            paper
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaperMetadata;
    use crate::store::QuestionRecord;
    use chrono::Utc;

    fn question(order: u32) -> QuestionRecord {
        QuestionRecord {
            id: None,
            question_number: (order + 1).to_string(),
            sequence_order: order,
            marks: None,
            page: 1,
            content: Vec::new(),
        }
    }

    #[test]
    fn test_insert_assigns_ids_and_preserves_order() {
        let store = MemoryPaperStore::new();
        let mut paper =
            PaperRecord::from_metadata(&PaperMetadata::new("OCR", 2022, "June", 1), Utc::now());
        paper.questions = vec![question(2), question(0), question(1)];

        let id = store.insert_paper(paper).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(store.len(), 1);

        let stored = store.get_paper(&id).unwrap().unwrap();
        assert_eq!(stored.id.as_deref(), Some(id.as_str()));
        let orders: Vec<u32> = stored.questions.iter().map(|q| q.sequence_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(stored.questions.iter().all(|q| q.id.is_some()));
    }

    #[test]
    fn test_missing_paper() {
        let store = MemoryPaperStore::new();
        assert!(store.is_empty());
        assert!(store.get_paper("nope").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = MemoryPaperStore::new();
        let mut paper =
            PaperRecord::from_metadata(&PaperMetadata::new("AQA", 2020, "June", 1), Utc::now());
        paper.id = Some("fixed".to_string());

        store.insert_paper(paper.clone()).unwrap();
        let err = store.insert_paper(paper).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!err.is_client_error());
    }
}
