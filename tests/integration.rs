//! Integration tests for the folio export pipeline.
//!
//! These tests exercise records through layout to PDF bytes. They verify:
//! - Records land on the right pages and rows
//! - The eager page rule fires only when more records follow
//! - Split fields carry continuation markers on both sides of the cut
//! - Page provisioning failures abort the export
//! - PDF output is structurally valid

use async_trait::async_trait;

use folio::config::{ColumnDef, PageSize, TableLayoutConfig};
use folio::export::{layout_document, render_records, ExportOptions};
use folio::import::{convert_exports, parse_exports};
use folio::layout::{layout, DrawCommand, FlowEngine, PageHandle, PageProvider};
use folio::model::Record;
use folio::pdf::{Metadata, PageTemplate, PdfDocument};
use folio::FolioError;

// ─── Helpers ────────────────────────────────────────────────────

/// In-memory page source that counts pages and can refuse to grow.
struct FakePages {
    pages: usize,
    requests: usize,
    limit: Option<usize>,
}

impl FakePages {
    fn new() -> Self {
        Self {
            pages: 1,
            requests: 0,
            limit: None,
        }
    }

    fn limited(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }
}

#[async_trait]
impl PageProvider for FakePages {
    fn page(&self, index: usize) -> Result<PageHandle, FolioError> {
        if index < self.pages {
            Ok(PageHandle::new(index))
        } else {
            Err(FolioError::InvalidPage(index))
        }
    }

    async fn new_page(&mut self) -> Result<PageHandle, FolioError> {
        self.requests += 1;
        if self.limit.is_some_and(|limit| self.pages >= limit) {
            return Err(FolioError::PageProvision("no more pages".to_string()));
        }
        self.pages += 1;
        Ok(PageHandle::new(self.pages - 1))
    }
}

/// A record whose question wraps to exactly `lines` lines of `width` chars.
fn record_with_lines(lines: usize, width: usize) -> Record {
    Record::new(&"q".repeat(lines * width), "Grund", "Gut", "gpt-4o")
}

fn one_row_record(n: usize) -> Record {
    Record::new(&format!("Frage {}", n), "Grund", "Gut", "gpt-4o")
}

fn on_page(commands: &[DrawCommand], page: usize) -> Vec<&DrawCommand> {
    commands.iter().filter(|c| c.page.index() == page).collect()
}

fn assert_no_markers(commands: &[DrawCommand]) {
    assert!(
        commands.iter().all(|c| !c.text.contains("...")),
        "unexpected continuation marker"
    );
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(bytes.windows(5).any(|w| w == b"%%EOF"), "Missing %%EOF marker");
    assert!(bytes.windows(4).any(|w| w == b"xref"), "Missing xref table");
    assert!(bytes.windows(7).any(|w| w == b"trailer"), "Missing trailer");
}

fn count_pages(bytes: &[u8]) -> usize {
    let needle = b"/Type /Page /Parent";
    bytes.windows(needle.len()).filter(|w| w == needle).count()
}

// ─── Page Capacity Tests ────────────────────────────────────────

#[tokio::test]
async fn test_record_filling_last_page_requests_nothing() {
    // 50 lines at 7 lines per row = 8 rows = one full page
    let config = TableLayoutConfig::default();
    let mut pages = FakePages::new();
    let commands = layout(&[record_with_lines(50, 57)], &config, &mut pages)
        .await
        .unwrap();

    assert_eq!(pages.requests, 0);
    assert_eq!(pages.pages, 1);
    assert_no_markers(&commands);
    // 50 question lines plus one line each for the other three fields
    assert_eq!(commands.len(), 53);
}

#[tokio::test]
async fn test_full_page_before_more_records_starts_next_page() {
    let config = TableLayoutConfig::default();
    let mut pages = FakePages::new();
    let commands = layout(&[record_with_lines(50, 57), one_row_record(2)], &config, &mut pages)
        .await
        .unwrap();

    assert_eq!(pages.requests, 1);
    let second = on_page(&commands, 1);
    assert_eq!(second.len(), 4);
    assert_eq!(second[0].text, "Frage 2");
    // cursor was reset: first row of the new page
    assert_eq!(second[0].y, config.start_y + config.text_padding);
    assert_no_markers(&commands);
}

#[tokio::test]
async fn test_nine_single_row_records_make_two_pages() {
    let config = TableLayoutConfig::default();
    let records: Vec<Record> = (1..=9).map(one_row_record).collect();
    let mut pages = FakePages::new();
    let commands = layout(&records, &config, &mut pages).await.unwrap();

    assert_eq!(pages.pages, 2);
    assert_eq!(on_page(&commands, 0).len(), 8 * 4);
    assert_eq!(on_page(&commands, 1).len(), 4);
    assert_eq!(on_page(&commands, 1)[0].text, "Frage 9");
    assert_no_markers(&commands);
}

#[tokio::test]
async fn test_empty_record_renders_blank_cells() {
    let config = TableLayoutConfig::default();
    let mut pages = FakePages::new();
    let commands = layout(&[Record::default()], &config, &mut pages).await.unwrap();

    assert_eq!(pages.pages, 1);
    assert_eq!(commands.len(), 4);
    assert!(commands.iter().all(|c| c.text.is_empty()));
    assert!(commands.iter().all(|c| c.y == config.start_y + config.text_padding));
}

#[tokio::test]
async fn test_rows_stack_down_the_page() {
    let config = TableLayoutConfig::default();
    let mut pages = FakePages::new();
    let commands = layout(&[one_row_record(1), one_row_record(2), one_row_record(3)], &config, &mut pages)
        .await
        .unwrap();

    let ys: Vec<f64> = commands.iter().step_by(4).map(|c| c.y).collect();
    assert_eq!(ys, vec![410.0, 371.0, 332.0]);
}

// ─── Split and Ellipsis Tests ───────────────────────────────────

fn narrow_config(lines_per_row: usize, max_rows: usize) -> TableLayoutConfig {
    TableLayoutConfig {
        columns: vec![
            ColumnDef::new("Anfrage", 0.0, 10),
            ColumnDef::new("Grund", 100.0, 10),
        ],
        lines_per_row,
        max_rows_per_page: max_rows,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_split_field_marks_both_pages() {
    // 2 lines per row, 2 rows per page: the first record takes row 0, so
    // only 2 of the second record's 3 lines fit on page 0.
    let config = narrow_config(2, 2);
    let records = [
        Record::new("erste", "", "", ""),
        Record::new(&format!("{}{}{}", "a".repeat(10), "b".repeat(10), "c".repeat(10)), "kurz", "", ""),
    ];
    let mut pages = FakePages::new();
    let commands = layout(&records, &config, &mut pages).await.unwrap();

    assert_eq!(pages.pages, 2);
    let question: Vec<&DrawCommand> = commands.iter().filter(|c| c.x == 57.0 && c.text != "erste").collect();
    assert_eq!(question.len(), 3);
    assert_eq!(question[0].text, "aaaaaaaaaa");
    assert_eq!(question[1].text, "bbbbbbb...");
    assert_eq!(question[1].page.index(), 0);
    assert_eq!(question[2].text, "...ccccccc");
    assert_eq!(question[2].page.index(), 1);

    // the short field fits before the cut and stays unmarked
    let reason: Vec<&DrawCommand> = commands.iter().filter(|c| c.text == "kurz").collect();
    assert_eq!(reason.len(), 1);
    assert_eq!(reason[0].page.index(), 0);
}

#[tokio::test]
async fn test_long_record_spans_several_pages() {
    // 1 line per row, 2 rows per page, 5 lines: pages hold 2 + 2 + 1
    let config = narrow_config(1, 2);
    let mut pages = FakePages::new();
    let commands = layout(&[record_with_lines(5, 10)], &config, &mut pages).await.unwrap();

    assert_eq!(pages.pages, 3);
    let question: Vec<(usize, &str)> = commands
        .iter()
        .filter(|c| c.x == 57.0)
        .map(|c| (c.page.index(), c.text.as_str()))
        .collect();
    assert_eq!(
        question,
        vec![
            (0, "qqqqqqqqqq"),
            (0, "qqqqqqq..."),
            (1, "...qqqqqqq"),
            (1, "qqqqqqq..."),
            (2, "...qqqqqqq"),
        ]
    );
}

#[tokio::test]
async fn test_exactly_full_page_then_single_row_record() {
    let config = narrow_config(7, 8);
    let mut pages = FakePages::new();
    let records = [record_with_lines(56, 10), Record::new("danach", "", "", "")];
    let commands = layout(&records, &config, &mut pages).await.unwrap();

    assert_eq!(pages.requests, 1);
    assert_no_markers(&commands);
    let after: Vec<&DrawCommand> = commands.iter().filter(|c| c.text == "danach").collect();
    assert_eq!(after[0].page.index(), 1);
    assert_eq!(after[0].y, config.start_y + config.text_padding);
}

// ─── Failure Tests ──────────────────────────────────────────────

#[tokio::test]
async fn test_empty_input_is_reported() {
    let mut pages = FakePages::new();
    let err = layout(&[], &TableLayoutConfig::default(), &mut pages).await.unwrap_err();
    assert!(matches!(err, FolioError::EmptyInput));
    assert_eq!(pages.requests, 0);
}

#[tokio::test]
async fn test_page_provision_failure_aborts_layout() {
    let records: Vec<Record> = (1..=9).map(one_row_record).collect();
    let mut pages = FakePages::limited(1);
    let err = layout(&records, &TableLayoutConfig::default(), &mut pages)
        .await
        .unwrap_err();
    assert!(matches!(err, FolioError::PageProvision(_)));
    assert_eq!(pages.requests, 1, "no retry inside the engine");
}

#[tokio::test]
async fn test_page_limit_fails_export() {
    let records: Vec<Record> = (1..=9).map(one_row_record).collect();
    let options = ExportOptions {
        max_pages: Some(1),
        ..Default::default()
    };
    let err = render_records(&records, &options).await.unwrap_err();
    assert!(matches!(err, FolioError::PageProvision(_)));
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let config = TableLayoutConfig {
        columns: vec![ColumnDef::new("Anfrage", 0.0, 0)],
        ..Default::default()
    };
    assert!(matches!(FlowEngine::new(config), Err(FolioError::Config(_))));
}

// ─── PDF Output Tests ───────────────────────────────────────────

#[tokio::test]
async fn test_export_produces_valid_pdf() {
    let records: Vec<Record> = (1..=20).map(one_row_record).collect();
    let options = ExportOptions {
        metadata: Metadata {
            title: Some("Export".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let bytes = render_records(&records, &options).await.unwrap();

    assert_valid_pdf(&bytes);
    // 8 + 8 + 4
    assert_eq!(count_pages(&bytes), 3);
}

#[tokio::test]
async fn test_every_page_carries_the_template() {
    let config = TableLayoutConfig::default();
    let records: Vec<Record> = (1..=9).map(one_row_record).collect();
    let document = layout_document(&records, &ExportOptions::default()).await.unwrap();

    let grid = PageTemplate::table_grid(&config);
    assert_eq!(document.page_count(), 2);
    for page in document.pages() {
        assert_eq!(page.background, grid.items);
    }
    assert_eq!(document.pages()[1].runs.len(), 4);
}

#[tokio::test]
async fn test_blank_pages_at_template_size() {
    let portrait = PageSize {
        width: 595.28,
        height: 841.89,
    };
    let mut document = PdfDocument::blank(portrait);
    let commands = FlowEngine::new(TableLayoutConfig::default())
        .unwrap()
        .layout(&(1..=9).map(one_row_record).collect::<Vec<_>>(), &mut document)
        .await
        .unwrap();
    document.apply(&commands).unwrap();

    assert_eq!(document.page_count(), 2);
    assert!(document.pages().iter().all(|p| p.background.is_empty()));
    let bytes = document.write(&Metadata::default()).unwrap();
    assert_valid_pdf(&bytes);
    assert!(bytes.windows(28).any(|w| w == b"/MediaBox [0 0 595.28 841.89"));
}

// ─── Import Pipeline Tests ──────────────────────────────────────

#[tokio::test]
async fn test_saved_conversation_to_pdf() {
    let json = r#"{
        "meta": { "timestamp": "2026-03-09T14:05:12.345Z", "url": "", "title": "Rust" },
        "turns": [
            { "id": "1", "role": "user", "model": "", "text": "Was ist ein Trait?", "date": "2026-03-09T14:00:00Z" },
            { "id": "2", "role": "assistant", "model": "gpt-4o", "text": "Ein Interface.", "date": "2026-03-09T14:00:03Z" }
        ]
    }"#;
    let chats = convert_exports(&parse_exports(json).unwrap());
    let today = chrono::NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
    let records = folio::export::records_from_pairs(
        &chats[0].pairs,
        today,
        &folio::config::FieldMapping::default(),
        false,
    );
    assert_eq!(records[0].primary_text, "Was ist ein Trait? (09.03.2026)");
    assert_eq!(records[0].version_tag, "gpt-4o");

    let bytes = render_records(&records, &ExportOptions::default()).await.unwrap();
    assert_valid_pdf(&bytes);
    assert_eq!(count_pages(&bytes), 1);
}
