//! Turning segmented questions into stored records.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{ContentItem, ImageRun, PaperMetadata, Question};

use super::{BlobStore, ContentBody, ContentRecord, PaperRecord, PaperStore, QuestionRecord};

/// Summary of a published paper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub paper_id: String,
    pub title: String,
    pub questions: usize,
    pub text_items: usize,
    pub images: usize,
    /// Blob references in upload order
    pub image_urls: Vec<String>,
}

/// Blob key for an image: `{paper_id}/{question_label}/img_p{page}_{index}.{format}`.
///
/// Page and table index identify an image within the paper, so no two
/// images share a key even when a question spans pages.
pub fn image_key(paper_id: &str, label: &str, image: &ImageRun) -> String {
    format!(
        "{}/{}/img_p{}_{}.{}",
        paper_id, label, image.page, image.index, image.format
    )
}

/// Validate metadata, upload every question image and store the paper.
///
/// Images are uploaded before the paper record is written, so a failed
/// upload leaves no record behind.
pub fn publish<B, P>(
    metadata: &PaperMetadata,
    questions: &[Question<'_>],
    blobs: &B,
    papers: &P,
) -> Result<IngestReport>
where
    B: BlobStore + ?Sized,
    P: PaperStore + ?Sized,
{
    metadata.validate()?;

    let paper_id = Uuid::new_v4().to_string();
    let mut record = PaperRecord::from_metadata(metadata, Utc::now());
    record.id = Some(paper_id.clone());

    let mut image_urls = Vec::new();
    let mut text_items = 0;

    for question in questions {
        let mut content = Vec::with_capacity(question.content.len());

        for (order, item) in question.content.iter().enumerate() {
            let body = match item {
                ContentItem::Text(run) => {
                    text_items += 1;
                    ContentBody::Text {
                        text: run.text.clone(),
                        font_size: run.font_size,
                        font_family: run.font_family.clone(),
                        is_bold: run.is_bold,
                        is_italic: run.is_italic,
                        bbox: run.bbox,
                    }
                }
                ContentItem::Image(image) => {
                    let key = image_key(&paper_id, &question.label, image);
                    let url = blobs.put_image(&key, &image.data, &image.format)?;
                    image_urls.push(url.clone());
                    ContentBody::Image {
                        image_url: url,
                        image_width: image.width,
                        image_height: image.height,
                        bbox: image.bbox,
                        alt_text: format!("Image {} for question {}", image.index, question.label),
                    }
                }
            };
            content.push(ContentRecord {
                id: None,
                sequence_order: order as u32,
                body,
            });
        }

        record.questions.push(QuestionRecord {
            id: None,
            question_number: question.label.clone(),
            sequence_order: question.sequence_order,
            marks: question.marks,
            page: question.page,
            content,
        });
    }

    let title = record.title.clone();
    let question_count = record.questions.len();
    let stored_id = papers.insert_paper(record)?;
    log::info!(
        "published paper {} ({} questions, {} images)",
        stored_id,
        question_count,
        image_urls.len()
    );

    Ok(IngestReport {
        paper_id: stored_id,
        title,
        questions: question_count,
        text_items,
        images: image_urls.len(),
        image_urls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{BoundingBox, TextRun};
    use crate::store::MemoryPaperStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBlobs {
        keys: Mutex<Vec<String>>,
    }

    impl BlobStore for RecordingBlobs {
        fn put_image(&self, key: &str, _data: &[u8], _format: &str) -> Result<String> {
            self.keys.lock().unwrap().push(key.to_string());
            Ok(format!("mem://{}", key))
        }
    }

    struct FailingBlobs;

    impl BlobStore for FailingBlobs {
        fn put_image(&self, _key: &str, _data: &[u8], _format: &str) -> Result<String> {
            Err(Error::Storage("bucket unavailable".to_string()))
        }
    }

    fn image(index: usize) -> ImageRun {
        ImageRun {
            data: vec![0x89, b'P', b'N', b'G'],
            format: "png".to_string(),
            width: 20,
            height: 10,
            bbox: BoundingBox::new(72.0, 300.0, 200.0, 100.0),
            index,
            page: 1,
        }
    }

    #[test]
    fn test_publish_records_and_keys() {
        let stem = TextRun::new("1 Define GDP. [2 marks]", 11.0);
        let body = TextRun::new("Use Figure 1.", 11.0);
        let figure = image(3);
        let later = TextRun::new("2(a) Explain scarcity.", 11.0);

        let mut q1 = Question::new("1", 0, Some(2), 1);
        q1.content = vec![
            ContentItem::Text(&stem),
            ContentItem::Text(&body),
            ContentItem::Image(&figure),
        ];
        let mut q2 = Question::new("2(a)", 1, None, 2);
        q2.content = vec![ContentItem::Text(&later)];

        let blobs = RecordingBlobs::default();
        let papers = MemoryPaperStore::new();
        let metadata = PaperMetadata::new("AQA", 2023, "June", 1);

        let report = publish(&metadata, &[q1, q2], &blobs, &papers).unwrap();
        assert_eq!(report.questions, 2);
        assert_eq!(report.text_items, 3);
        assert_eq!(report.images, 1);
        assert_eq!(report.title, "AQA Economics A-Level Paper 1 - June 2023");

        let keys = blobs.keys.lock().unwrap().clone();
        assert_eq!(keys, vec![format!("{}/1/img_p1_3.png", report.paper_id)]);
        assert_eq!(report.image_urls, vec![format!("mem://{}", keys[0])]);

        let stored = papers.get_paper(&report.paper_id).unwrap().unwrap();
        assert_eq!(stored.questions.len(), 2);
        assert_eq!(stored.questions[0].question_number, "1");
        assert_eq!(stored.questions[1].question_number, "2(a)");

        let orders: Vec<u32> = stored.questions[0]
            .content
            .iter()
            .map(|c| c.sequence_order)
            .collect();
        assert_eq!(orders, vec![0, 1, 2]);
        match &stored.questions[0].content[2].body {
            ContentBody::Image {
                alt_text,
                image_width,
                image_height,
                ..
            } => {
                assert_eq!(alt_text, "Image 3 for question 1");
                assert_eq!((*image_width, *image_height), (20, 10));
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_image_keys_distinct_across_pages() {
        let first = image(0);
        let mut second = image(0);
        second.page = 2;
        let mut question = Question::new("1", 0, None, 1);
        question.content = vec![ContentItem::Image(&first), ContentItem::Image(&second)];

        let blobs = RecordingBlobs::default();
        let papers = MemoryPaperStore::new();
        let metadata = PaperMetadata::new("AQA", 2023, "June", 1);
        let report = publish(&metadata, &[question], &blobs, &papers).unwrap();

        let keys = blobs.keys.lock().unwrap().clone();
        assert_eq!(
            keys,
            vec![
                format!("{}/1/img_p1_0.png", report.paper_id),
                format!("{}/1/img_p2_0.png", report.paper_id),
            ]
        );
    }

    #[test]
    fn test_invalid_metadata_stores_nothing() {
        let papers = MemoryPaperStore::new();
        let metadata = PaperMetadata::new("AQA", 1990, "June", 1);
        let err = publish(&metadata, &[], &RecordingBlobs::default(), &papers).unwrap_err();
        assert!(err.is_client_error());
        assert!(papers.is_empty());
    }

    #[test]
    fn test_failed_upload_stores_nothing() {
        let figure = image(0);
        let mut question = Question::new("1", 0, None, 1);
        question.content.push(ContentItem::Image(&figure));

        let papers = MemoryPaperStore::new();
        let metadata = PaperMetadata::new("AQA", 2023, "June", 1);
        let err = publish(&metadata, &[question], &FailingBlobs, &papers).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(papers.is_empty());
    }
}
