//! End-to-end tests for extraction followed by segmentation.

mod common;

use common::{build_pdf, economics_paper, rgb_image, TestPage};
use paperseg::{
    extract, parse_bytes, segment, ContentItem, ImagePlacement, JsonFormat, Paperseg,
    SegmentOptions, Segmenter,
};

#[test]
fn test_two_page_paper() {
    let doc = extract(&economics_paper()).unwrap();
    let questions = segment(&doc.pages);

    assert_eq!(questions.len(), 2);

    let first = &questions[0];
    assert_eq!(first.label, "1");
    assert_eq!(first.sequence_order, 0);
    assert_eq!(first.marks, Some(2));
    assert_eq!(first.page, 1);
    assert_eq!(first.content.len(), 3);
    assert!(matches!(first.content[0], ContentItem::Text(run) if run.text == "1 Define GDP. [2 marks]"));
    assert!(matches!(first.content[1], ContentItem::Text(run) if run.text == "Explain your answer."));
    assert!(first.content[2].is_image());
    assert!(std::ptr::eq(
        first.content[2].as_image().unwrap(),
        &doc.pages[0].image_runs[0]
    ));

    let second = &questions[1];
    assert_eq!(second.label, "2");
    assert_eq!(second.sequence_order, 1);
    assert_eq!(second.marks, None);
    assert_eq!(second.page, 2);
    assert_eq!(second.plain_text(), "2 Explain scarcity.");
}

#[test]
fn test_small_print_never_opens_question() {
    let pdf = build_pdf(vec![TestPage::new(
        "BT /F1 11 Tf 72 700 Td (1 Study Figure 1.) Tj ET \
         BT /F1 7 Tf 72 600 Td (2019 Source: Office for National Statistics) Tj ET \
         BT /F1 11 Tf 72 500 Td (2 (a) Calculate the change. (4 marks)) Tj ET",
    )]);
    let doc = extract(&pdf).unwrap();
    let questions = segment(&doc.pages);

    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].content.len(), 2);
    assert_eq!(questions[1].label, "2 (a)");
    assert_eq!(questions[1].marks, Some(4));
}

#[test]
fn test_cover_page_content_dropped() {
    let pdf = build_pdf(vec![
        TestPage::new(
            "BT /F2 16 Tf 72 700 Td (A-Level Economics) Tj ET \
             BT /F1 11 Tf 72 650 Td (Answer ALL questions.) Tj ET",
        ),
        TestPage::new("BT /F1 11 Tf 72 700 Td (1 Define opportunity cost. [2]) Tj ET"),
    ]);
    let doc = extract(&pdf).unwrap();
    let questions = segment(&doc.pages);

    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].page, 2);
    assert_eq!(questions[0].marks, Some(2));
    assert_eq!(questions[0].content.len(), 1);
}

#[test]
fn test_every_run_lands_in_exactly_one_question() {
    let doc = extract(&economics_paper()).unwrap();
    let questions = segment(&doc.pages);

    let grouped: usize = questions.iter().map(|q| q.content.len()).sum();
    let total: usize = doc
        .pages
        .iter()
        .map(|p| p.text_runs.len() + p.image_runs.len())
        .sum();
    assert_eq!(grouped, total);

    let orders: Vec<u32> = questions.iter().map(|q| q.sequence_order).collect();
    assert_eq!(orders, (0..questions.len() as u32).collect::<Vec<_>>());
}

#[test]
fn test_by_position_places_image_between_questions() {
    // Image sits between question 1 (top) and question 2 (bottom).
    let pdf = build_pdf(vec![TestPage::new(
        "BT /F1 11 Tf 72 700 Td (1 Study Figure 1.) Tj ET \
         BT /F1 11 Tf 72 200 Td (2 Explain the trend.) Tj ET \
         q 200 0 0 150 100 400 cm /Im0 Do Q",
    )
    .with_image("Im0", rgb_image(2, 2))]);
    let doc = extract(&pdf).unwrap();

    let page_end = segment(&doc.pages);
    assert_eq!(page_end[0].images().count(), 0);
    assert_eq!(page_end[1].images().count(), 1);

    let by_position = Segmenter::new(SegmentOptions::new().by_position()).segment(&doc.pages);
    assert_eq!(by_position[0].images().count(), 1);
    assert_eq!(by_position[1].images().count(), 0);
}

#[test]
fn test_builder_pipeline() {
    let paper = Paperseg::new()
        .sequential()
        .with_min_label_font_size(12.0)
        .with_image_placement(ImagePlacement::ByPosition)
        .parse_bytes(&economics_paper())
        .unwrap();

    // Every label run is 11pt, below the raised threshold.
    assert!(paper.questions().is_empty());
    assert_eq!(paper.document().page_count(), 2);
}

#[test]
fn test_parse_bytes_renders_questions() {
    let paper = parse_bytes(&economics_paper()).unwrap();

    let json = paper.questions_json(JsonFormat::Compact).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let questions = value.as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["label"], "1");
    assert_eq!(questions[0]["marks"], 2);
    assert_eq!(questions[0]["content"][2]["type"], "IMAGE");
    assert!(questions[0]["content"][2]["data"].get("data").is_none());

    let text = paper.questions_text();
    assert!(text.starts_with("Question 1 (page 1) [2 marks]\n1 Define GDP. [2 marks]"));
    assert!(text.contains("[image 0 on page 1: png 2x2]"));
    assert!(text.contains("Question 2 (page 2)\n2 Explain scarcity."));
}

#[test]
fn test_segmentation_is_deterministic() {
    let doc = extract(&economics_paper()).unwrap();
    assert_eq!(segment(&doc.pages), segment(&doc.pages));
}
