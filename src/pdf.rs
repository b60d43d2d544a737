use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use thiserror::Error;

use crate::models::PlanningRequest;
use crate::plan::DayRecord;

// A4 in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 11;
const TITLE_SIZE: i64 = 16;
const LINE_HEIGHT: i64 = 16;
// Courier glyphs are 0.6em wide.
const MAX_COLUMNS: usize = ((PAGE_WIDTH - 2 * MARGIN) * 10 / (FONT_SIZE * 6)) as usize;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

enum Block {
    Title(String),
    Text(String),
    Gap,
}

/// Renders a generated plan into a paginated A4 document.
#[derive(Clone, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(
        &self,
        request: &PlanningRequest,
        days: &[DayRecord],
        reference_date: NaiveDate,
    ) -> Result<Vec<u8>, RenderError> {
        let blocks = layout(request, days, reference_date);
        let pages = paginate(&blocks);
        write_document(&pages)
    }
}

fn layout(request: &PlanningRequest, days: &[DayRecord], reference_date: NaiveDate) -> Vec<Block> {
    let mut blocks = vec![
        Block::Title(format!("Structured {}-Day Study Plan", days.len())),
        Block::Gap,
        Block::Text(format!("Goal: {}", request.goal.trim())),
        Block::Text(format!(
            "Daily Study Time: {} hrs",
            request.hours_per_day.trim()
        )),
        Block::Text(format!(
            "Time Slot: {} - {}",
            request.time_slot.start.trim(),
            request.time_slot.end.trim()
        )),
        Block::Gap,
    ];

    for day in days {
        let date = day
            .date(reference_date)
            .map(|d| d.format(" (%Y-%m-%d)").to_string())
            .unwrap_or_default();
        let header = if day.label.is_empty() {
            format!("Day {}{date}", day.day_number)
        } else {
            format!("Day {}: {}{date}", day.day_number, day.label)
        };
        let times = if day.time_intervals.is_empty() {
            "-".to_string()
        } else {
            day.time_intervals
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        };
        let lines = [
            header,
            format!("Topics: {}", day.topics),
            format!("Time Allotted: {times}"),
        ];
        for line in lines {
            blocks.extend(wrap(&line).into_iter().map(Block::Text));
        }
        blocks.push(Block::Gap);
    }
    blocks
}

/// Greedy word wrap at `MAX_COLUMNS`; words longer than a line are split.
fn wrap(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > MAX_COLUMNS {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(MAX_COLUMNS);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.len() > MAX_COLUMNS {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn paginate(blocks: &[Block]) -> Vec<Vec<Operation>> {
    let mut pages = Vec::new();
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for block in blocks {
        if y < MARGIN + LINE_HEIGHT {
            pages.push(std::mem::take(&mut ops));
            y = PAGE_HEIGHT - MARGIN;
        }
        match block {
            Block::Gap => y -= LINE_HEIGHT / 2,
            Block::Title(text) => {
                let x = (PAGE_WIDTH - (text.chars().count() as i64 * TITLE_SIZE * 6 / 10)) / 2;
                ops.extend(text_ops(text, x.max(MARGIN), y, TITLE_SIZE));
                y -= LINE_HEIGHT + 4;
            }
            Block::Text(text) => {
                ops.extend(text_ops(text, MARGIN, y, FONT_SIZE));
                y -= LINE_HEIGHT;
            }
        }
    }
    if !ops.is_empty() || pages.is_empty() {
        pages.push(ops);
    }
    pages
}

/// Base-14 fonts only cover Latin-1; anything else becomes `?`.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn text_ops(text: &str, x: i64, y: i64, size: i64) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new(
            "Tj",
            vec![Object::String(
                encode_latin1(text),
                lopdf::StringFormat::Literal,
            )],
        ),
        Operation::new("ET", vec![]),
    ]
}

fn write_document(pages: &[Vec<Operation>]) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content {
            operations: operations.clone(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let media_box: Vec<Object> = vec![
        0_i64.into(),
        0_i64.into(),
        PAGE_WIDTH.into(),
        PAGE_HEIGHT.into(),
    ];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeSlot;
    use crate::plan::parse_plan;

    fn request() -> PlanningRequest {
        PlanningRequest {
            goal: "Pass the algebra exam".into(),
            hours_per_day: "2".into(),
            time_slot: TimeSlot {
                start: "18:00".into(),
                end: "20:00".into(),
            },
            start_date: None,
        }
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 14).unwrap()
    }

    #[test]
    fn test_render_produces_pdf() {
        let days = parse_plan("Day 1: Monday\nTopics: Algebra\nTime Allotted: 18:00-19:00").unwrap();
        let bytes = PdfRenderer::new().render(&request(), &days, reference()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let loaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), 1);
    }

    #[test]
    fn test_long_plan_spans_pages() {
        let text: String = (1..=60)
            .map(|n| format!("Day {n}: Day\nTopics: Chapter {n}\nTime Allotted: 18:00-19:00\n"))
            .collect();
        let days = parse_plan(&text).unwrap();
        let bytes = PdfRenderer::new().render(&request(), &days, reference()).unwrap();
        let loaded = Document::load_mem(&bytes).unwrap();
        assert!(loaded.get_pages().len() > 1);
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "word ".repeat(60);
        let lines = wrap(&text);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= MAX_COLUMNS));

        let long = "x".repeat(MAX_COLUMNS * 2 + 3);
        let lines = wrap(&long);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_encode_latin1_replaces_wide_chars() {
        assert_eq!(encode_latin1("Zürich ✓"), b"Z\xfcrich ?".to_vec());
    }
}
