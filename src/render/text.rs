//! Plain text rendering.

use std::fmt::Write;

use crate::model::{Document, Question};

/// Plain text of every page, pages separated by a blank line.
pub fn to_text(doc: &Document) -> String {
    doc.plain_text().trim().to_string()
}

/// One block per question: a header line, the question text, then one
/// line per image.
pub fn questions_to_text(questions: &[Question<'_>]) -> String {
    let mut out = String::new();

    for question in questions {
        let _ = write!(out, "Question {} (page {})", question.label, question.page);
        match question.marks {
            Some(1) => out.push_str(" [1 mark]"),
            Some(marks) => {
                let _ = write!(out, " [{} marks]", marks);
            }
            None => {}
        }
        out.push('\n');

        let text = question.plain_text();
        if !text.is_empty() {
            out.push_str(&text);
            out.push('\n');
        }

        for image in question.images() {
            let _ = writeln!(
                out,
                "[image {} on page {}: {} {}x{}]",
                image.index, image.page, image.format, image.width, image.height
            );
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentItem, ImageRun, Page, TextRun};

    #[test]
    fn test_to_text() {
        let mut doc = Document::new();
        let mut page = Page::a4(1);
        page.add_text(TextRun::new("1 Define GDP.", 11.0));
        doc.add_page(page);
        let mut page = Page::a4(2);
        page.add_text(TextRun::new("2 Explain scarcity.", 11.0));
        doc.add_page(page);

        assert_eq!(to_text(&doc), "1 Define GDP.\n\n2 Explain scarcity.");
    }

    #[test]
    fn test_questions_to_text() {
        let first = TextRun::new("1 Define GDP. [2 marks]", 11.0);
        let second = TextRun::new("2 Explain scarcity. [1 mark]", 11.0);
        let image = ImageRun {
            data: Vec::new(),
            format: "jpeg".to_string(),
            width: 640,
            height: 480,
            bbox: Default::default(),
            index: 0,
            page: 1,
        };

        let mut q1 = Question::new("1", 0, Some(2), 1);
        q1.content.push(ContentItem::Text(&first));
        q1.content.push(ContentItem::Image(&image));
        let mut q2 = Question::new("2", 1, Some(1), 2);
        q2.content.push(ContentItem::Text(&second));

        let text = questions_to_text(&[q1, q2]);
        assert_eq!(
            text,
            "Question 1 (page 1) [2 marks]\n1 Define GDP. [2 marks]\n[image 0 on page 1: jpeg 640x480]\n\n\
             Question 2 (page 2) [1 mark]\n2 Explain scarcity. [1 mark]"
        );
    }
}
