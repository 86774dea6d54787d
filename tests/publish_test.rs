//! Integration tests for publishing segmented papers to stores.

mod common;

use std::sync::Mutex;

use common::{build_pdf, economics_paper, rgb_image, TestPage};
use paperseg::store::ContentBody;
use paperseg::{
    parse_bytes, BlobStore, DirectoryBlobStore, Error, MemoryPaperStore, PaperMetadata,
    PaperStore, Result,
};

/// Blob store that refuses every upload.
struct UnavailableBlobs;

impl BlobStore for UnavailableBlobs {
    fn put_image(&self, key: &str, _data: &[u8], _format: &str) -> Result<String> {
        Err(Error::Storage(format!("bucket offline, cannot write {}", key)))
    }
}

/// Blob store that only records the keys it was given.
#[derive(Default)]
struct KeyLog {
    keys: Mutex<Vec<String>>,
}

impl BlobStore for KeyLog {
    fn put_image(&self, key: &str, _data: &[u8], _format: &str) -> Result<String> {
        self.keys.lock().unwrap().push(key.to_string());
        Ok(format!("mem://{}", key))
    }
}

fn metadata() -> PaperMetadata {
    PaperMetadata::new("AQA", 2023, "June", 1).with_total_marks(80)
}

#[test]
fn test_publish_to_directory_and_memory() {
    let paper = parse_bytes(&economics_paper()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let blobs = DirectoryBlobStore::new(dir.path())
        .unwrap()
        .with_base_url("https://cdn.example.org/papers/");
    let papers = MemoryPaperStore::new();

    let report = paper.publish(&metadata(), &blobs, &papers).unwrap();
    assert_eq!(report.questions, 2);
    assert_eq!(report.text_items, 3);
    assert_eq!(report.images, 1);
    assert_eq!(report.title, "AQA Economics A-Level Paper 1 - June 2023");

    let key = format!("{}/1/img_p1_0.png", report.paper_id);
    assert_eq!(
        report.image_urls,
        vec![format!("https://cdn.example.org/papers/{}", key)]
    );
    let stored = std::fs::read(dir.path().join(&key)).unwrap();
    assert_eq!(stored, paper.document().pages[0].image_runs[0].data);

    let record = papers.get_paper(&report.paper_id).unwrap().unwrap();
    assert_eq!(record.total_marks, Some(80));
    assert_eq!(record.questions.len(), 2);
    assert_eq!(record.content_count(), 4);

    let first = &record.questions[0];
    assert_eq!(first.question_number, "1");
    assert_eq!(first.marks, Some(2));
    assert!(first.id.is_some());
    let orders: Vec<u32> = first.content.iter().map(|c| c.sequence_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);

    match &first.content[2].body {
        ContentBody::Image {
            image_url,
            image_width,
            image_height,
            alt_text,
            ..
        } => {
            assert_eq!(image_url, &report.image_urls[0]);
            assert_eq!((*image_width, *image_height), (2, 2));
            assert_eq!(alt_text, "Image 0 for question 1");
        }
        other => panic!("expected image content, got {:?}", other),
    }
}

#[test]
fn test_image_keys_follow_question_labels() {
    let paper = parse_bytes(&economics_paper()).unwrap();
    let blobs = KeyLog::default();
    let papers = MemoryPaperStore::new();

    let report = paper.publish(&metadata(), &blobs, &papers).unwrap();
    let keys = blobs.keys.lock().unwrap();
    assert_eq!(*keys, vec![format!("{}/1/img_p1_0.png", report.paper_id)]);
}

#[test]
fn test_question_spanning_pages_keeps_every_image() {
    let pdf = build_pdf(vec![
        TestPage::new(
            "BT /F1 11 Tf 72 700 Td (1 Study Figures 1 and 2. [6 marks]) Tj ET \
             q 100 0 0 100 72 400 cm /Im0 Do Q",
        )
        .with_image("Im0", rgb_image(2, 2)),
        TestPage::new(
            "BT /F1 11 Tf 72 700 Td (Figure 2 continues the data.) Tj ET \
             q 100 0 0 100 72 400 cm /Im0 Do Q",
        )
        .with_image("Im0", rgb_image(3, 3)),
    ]);
    let paper = parse_bytes(&pdf).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let blobs = DirectoryBlobStore::new(dir.path()).unwrap();
    let papers = MemoryPaperStore::new();

    let report = paper.publish(&metadata(), &blobs, &papers).unwrap();
    assert_eq!(report.questions, 1);
    assert_eq!(report.images, 2);
    assert_ne!(report.image_urls[0], report.image_urls[1]);

    let pages = &paper.document().pages;
    let first = std::fs::read(dir.path().join(format!("{}/1/img_p1_0.png", report.paper_id))).unwrap();
    let second = std::fs::read(dir.path().join(format!("{}/1/img_p2_0.png", report.paper_id))).unwrap();
    assert_eq!(first, pages[0].image_runs[0].data);
    assert_eq!(second, pages[1].image_runs[0].data);
}

#[test]
fn test_failed_upload_stores_nothing() {
    let paper = parse_bytes(&economics_paper()).unwrap();
    let papers = MemoryPaperStore::new();

    let err = paper
        .publish(&metadata(), &UnavailableBlobs, &papers)
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert!(!err.is_client_error());
    assert!(papers.is_empty());
}

#[test]
fn test_invalid_metadata_rejected_before_upload() {
    let paper = parse_bytes(&economics_paper()).unwrap();
    let blobs = KeyLog::default();
    let papers = MemoryPaperStore::new();

    let metadata = PaperMetadata::new("AQA", 1999, "June", 1);
    let err = paper.publish(&metadata, &blobs, &papers).unwrap_err();
    assert!(matches!(err, Error::InvalidMetadata(_)));
    assert!(err.is_client_error());
    assert!(blobs.keys.lock().unwrap().is_empty());
    assert!(papers.is_empty());
}

#[test]
fn test_stores_usable_as_trait_objects() {
    let paper = parse_bytes(&economics_paper()).unwrap();
    let blobs: Box<dyn BlobStore> = Box::new(KeyLog::default());
    let papers: Box<dyn PaperStore> = Box::new(MemoryPaperStore::new());

    let report = paper.publish(&metadata(), blobs.as_ref(), papers.as_ref()).unwrap();
    assert!(papers.get_paper(&report.paper_id).unwrap().is_some());
    assert!(papers.get_paper("missing").unwrap().is_none());
}
