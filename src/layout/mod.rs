//! # Flow Layout Engine
//!
//! Lays records into a fixed grid of table rows that spans a growing
//! sequence of pages.
//!
//! ## How a record is placed
//!
//! 1. Wrap each field with its column's fixed width
//! 2. The record needs as many rows as its longest field
//!    (`lines_per_row` wrapped lines per row, at least one row)
//! 3. If the rows fit on the current page: draw them, advance the cursor
//! 4. If not: fill the rest of the current page, ask the provider for a new
//!    page, and keep going until every line is drawn. Fields cut at a page
//!    boundary get `"..."` continuation markers on both sides of the cut
//! 5. A record that leaves the page exactly full makes the engine request
//!    the next page right away, but only if more records follow
//!
//! The engine never renders anything itself. It emits absolute
//! [`DrawCommand`]s and talks to pages only through the [`PageProvider`]
//! trait, so the whole flow is testable with an in-memory provider.

pub mod cursor;
pub mod ellipsis;
pub mod page_break;
pub mod rows;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::TableLayoutConfig;
use crate::error::FolioError;
use crate::font::FontRef;
use crate::model::Record;
use crate::text::wrap;

pub use cursor::PageCursor;
pub use ellipsis::mark_continuation;
pub use page_break::{decide_placement, Placement};
pub use rows::rows_needed;

/// Opaque reference to a physical page owned by a [`PageProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PageHandle(usize);

impl PageHandle {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// One absolutely positioned text fragment.
///
/// Commands are in emission order, which is not visual order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawCommand {
    pub page: PageHandle,
    /// Points from the left edge of the page.
    pub x: f64,
    /// Points from the bottom edge of the page (text baseline).
    pub y: f64,
    pub text: String,
    pub font_size: f64,
    pub font: FontRef,
}

/// Supplies the physical pages the engine draws on.
#[async_trait]
pub trait PageProvider: Send {
    /// An existing page. The engine starts on page 0.
    fn page(&self, index: usize) -> Result<PageHandle, FolioError>;

    /// Append a page, cloned from a template if the provider has one.
    async fn new_page(&mut self) -> Result<PageHandle, FolioError>;
}

/// The wrapped lines of one cell and where they start horizontally.
struct Cell {
    x: f64,
    lines: Vec<String>,
}

/// Places records onto pages. Holds only validated, read-only geometry.
#[derive(Debug, Clone)]
pub struct FlowEngine {
    config: TableLayoutConfig,
    font: FontRef,
}

impl FlowEngine {
    /// Validate `config` and build an engine around it.
    pub fn new(config: TableLayoutConfig) -> Result<Self, FolioError> {
        config.validate()?;
        Ok(Self {
            config,
            font: FontRef::monospace(),
        })
    }

    /// Use `font` in every emitted draw command.
    pub fn with_font(mut self, font: FontRef) -> Self {
        self.font = font;
        self
    }

    pub fn config(&self) -> &TableLayoutConfig {
        &self.config
    }

    /// Lay out `records` in order and return the draw commands.
    ///
    /// Fails with [`FolioError::EmptyInput`] when there is nothing to lay
    /// out. A failing `new_page()` aborts the job; commands emitted up to
    /// that point are dropped with it.
    pub async fn layout<P>(&self, records: &[Record], provider: &mut P) -> Result<Vec<DrawCommand>, FolioError>
    where
        P: PageProvider + ?Sized,
    {
        if records.is_empty() {
            return Err(FolioError::EmptyInput);
        }

        let mut commands = Vec::new();
        let mut cursor = PageCursor::new(self.config.max_rows_per_page);
        let mut page = provider.page(0)?;

        for (i, record) in records.iter().enumerate() {
            let cells = self.prepare_cells(record);
            let line_counts: Vec<usize> = cells.iter().map(|c| c.lines.len()).collect();
            let rows = rows_needed(&line_counts, self.config.lines_per_row);

            match decide_placement(rows, cursor.remaining_rows()) {
                Placement::Fits => {
                    debug!(record = i, rows, page = cursor.page_index(), row = cursor.row_offset(), "placing record");
                    self.place_on_page(&cells, rows, page, &cursor, &mut commands);
                    cursor.advance_rows(rows);
                }
                Placement::Split { rows_on_current_page } => {
                    debug!(
                        record = i,
                        rows,
                        rows_on_current_page,
                        page = cursor.page_index(),
                        "splitting record across pages"
                    );
                    page = self
                        .place_across_pages(&cells, rows, page, &mut cursor, provider, &mut commands)
                        .await?;
                }
            }

            // Eager pagination: a full page is left behind before the next
            // record is examined, never after the last one.
            if cursor.is_full() && i + 1 < records.len() {
                page = provider.new_page().await?;
                cursor.new_page();
                debug!(page = cursor.page_index(), "page full, started next page");
            }
        }

        Ok(commands)
    }

    /// Wrap every column of `record`. A blank field still draws one empty
    /// line so each cell of the row is present.
    fn prepare_cells(&self, record: &Record) -> Vec<Cell> {
        self.config
            .columns
            .iter()
            .map(|column| {
                let mut lines = wrap(record.column_text(&column.name), column.chars_per_line);
                if lines.is_empty() {
                    lines.push(String::new());
                }
                Cell {
                    x: self.config.start_x + column.offset_x + self.config.text_padding,
                    lines,
                }
            })
            .collect()
    }

    /// Draw a record that fits entirely below the cursor, one table row at
    /// a time.
    fn place_on_page(
        &self,
        cells: &[Cell],
        rows: usize,
        page: PageHandle,
        cursor: &PageCursor,
        commands: &mut Vec<DrawCommand>,
    ) {
        let lines_per_row = self.config.lines_per_row;

        for table_row in 0..rows {
            let row_y = self.row_y(cursor.row_offset() + table_row);
            let first_line = table_row * lines_per_row;

            for cell in cells {
                if first_line >= cell.lines.len() {
                    continue;
                }
                let last_line = (first_line + lines_per_row).min(cell.lines.len());
                for (line_index, line) in cell.lines[first_line..last_line].iter().enumerate() {
                    commands.push(self.command(page, cell.x, row_y, line_index, line.clone()));
                }
            }
        }
    }

    /// Draw a record that does not fit below the cursor, continuing on as
    /// many new pages as it takes. Returns the page the record ends on.
    async fn place_across_pages<P>(
        &self,
        cells: &[Cell],
        rows: usize,
        mut page: PageHandle,
        cursor: &mut PageCursor,
        provider: &mut P,
        commands: &mut Vec<DrawCommand>,
    ) -> Result<PageHandle, FolioError>
    where
        P: PageProvider + ?Sized,
    {
        let lines_per_row = self.config.lines_per_row;
        let mut remaining_rows = rows;
        let mut line_offset = 0;

        loop {
            if cursor.is_full() {
                page = provider.new_page().await?;
                cursor.new_page();
            }

            let rows_here = remaining_rows.min(cursor.remaining_rows());
            let max_lines = rows_here * lines_per_row;
            let row_y = self.row_y(cursor.row_offset());

            for cell in cells {
                let total = cell.lines.len();
                if line_offset >= total {
                    continue;
                }
                let end = (line_offset + max_lines).min(total);
                let slice = &cell.lines[line_offset..end];
                for (line_index, line) in slice.iter().enumerate() {
                    let text = mark_continuation(
                        line,
                        line_index == 0,
                        line_index == slice.len() - 1,
                        line_offset > 0,
                        end < total,
                    );
                    commands.push(self.command(page, cell.x, row_y, line_index, text));
                }
            }

            remaining_rows -= rows_here;
            line_offset += max_lines;
            cursor.advance_rows(rows_here);

            if remaining_rows == 0 {
                return Ok(page);
            }

            page = provider.new_page().await?;
            cursor.new_page();
            debug!(page = cursor.page_index(), remaining_rows, "record continues on next page");
        }
    }

    /// Top of the text area of the table row at `row` on the page.
    fn row_y(&self, row: usize) -> f64 {
        self.config.start_y - row as f64 * self.config.row_height
    }

    fn command(&self, page: PageHandle, x: f64, row_y: f64, line_index: usize, text: String) -> DrawCommand {
        DrawCommand {
            page,
            x,
            y: row_y + self.config.text_padding - line_index as f64 * self.config.line_height(),
            text,
            font_size: self.config.font_size,
            font: self.font.clone(),
        }
    }
}

/// Validate `config` and lay out `records` with a fresh engine.
pub async fn layout<P>(
    records: &[Record],
    config: &TableLayoutConfig,
    provider: &mut P,
) -> Result<Vec<DrawCommand>, FolioError>
where
    P: PageProvider + ?Sized,
{
    FlowEngine::new(config.clone())?.layout(records, provider).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnDef;

    /// Hands out page indices and records how many pages were requested.
    struct CountingProvider {
        pages: usize,
        fail_after: Option<usize>,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self { pages: 1, fail_after: None }
        }
    }

    #[async_trait]
    impl PageProvider for CountingProvider {
        fn page(&self, index: usize) -> Result<PageHandle, FolioError> {
            if index < self.pages {
                Ok(PageHandle::new(index))
            } else {
                Err(FolioError::InvalidPage(index))
            }
        }

        async fn new_page(&mut self) -> Result<PageHandle, FolioError> {
            if self.fail_after.is_some_and(|limit| self.pages >= limit) {
                return Err(FolioError::PageProvision("template copy failed".to_string()));
            }
            self.pages += 1;
            Ok(PageHandle::new(self.pages - 1))
        }
    }

    fn single_column(chars_per_line: usize, lines_per_row: usize, max_rows: usize) -> TableLayoutConfig {
        TableLayoutConfig {
            columns: vec![ColumnDef::new("Anfrage", 0.0, chars_per_line)],
            lines_per_row,
            max_rows_per_page: max_rows,
            ..Default::default()
        }
    }

    /// One paragraph that wraps to exactly `lines` lines at width 10.
    fn text_with_lines(lines: usize) -> String {
        "x".repeat(10 * lines)
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_pages() {
        let engine = FlowEngine::new(TableLayoutConfig::default()).unwrap();
        let mut provider = CountingProvider::new();
        let err = engine.layout(&[], &mut provider).await.unwrap_err();
        assert!(matches!(err, FolioError::EmptyInput));
        assert_eq!(provider.pages, 1);
    }

    #[test]
    fn invalid_config_never_builds_an_engine() {
        let config = TableLayoutConfig {
            lines_per_row: 0,
            ..Default::default()
        };
        assert!(matches!(FlowEngine::new(config), Err(FolioError::Config(_))));
    }

    #[tokio::test]
    async fn single_line_coordinates() {
        let config = TableLayoutConfig::default();
        let engine = FlowEngine::new(config.clone()).unwrap();
        let mut provider = CountingProvider::new();
        let records = [Record::new("Frage", "Grund", "Gut", "gpt-4o")];
        let commands = engine.layout(&records, &mut provider).await.unwrap();

        assert_eq!(commands.len(), 4);
        let first = &commands[0];
        assert_eq!(first.page, PageHandle::new(0));
        assert_eq!(first.text, "Frage");
        assert_eq!(first.x, 52.0 + 5.0);
        assert_eq!(first.y, 405.0 + 5.0);
        assert_eq!(first.font_size, 5.0);
        assert_eq!(first.font, FontRef::monospace());
        assert_eq!(commands[3].x, 52.0 + 537.0 + 5.0);
    }

    #[tokio::test]
    async fn second_row_lines_sit_one_row_lower() {
        // 9 lines at 7 lines/row: lines 8 and 9 go in the record's second table row.
        let config = single_column(10, 7, 8);
        let engine = FlowEngine::new(config).unwrap();
        let mut provider = CountingProvider::new();
        let commands = engine
            .layout(&[Record::new(&text_with_lines(9), "", "", "")], &mut provider)
            .await
            .unwrap();

        assert_eq!(commands.len(), 9);
        assert_eq!(commands[6].y, 410.0 - 6.0 * 5.0);
        assert_eq!(commands[7].y, 405.0 - 39.0 + 5.0);
        assert_eq!(commands[8].y, 405.0 - 39.0 + 5.0 - 5.0);
    }

    #[tokio::test]
    async fn cursor_offset_moves_following_records_down() {
        let config = single_column(10, 7, 8);
        let engine = FlowEngine::new(config).unwrap();
        let mut provider = CountingProvider::new();
        let records = [
            Record::new(&text_with_lines(14), "", "", ""),
            Record::new("next", "", "", ""),
        ];
        let commands = engine.layout(&records, &mut provider).await.unwrap();
        let next = commands.last().unwrap();
        assert_eq!(next.text, "next");
        assert_eq!(next.y, 405.0 - 2.0 * 39.0 + 5.0);
    }

    #[tokio::test]
    async fn split_marks_both_sides_of_the_cut() {
        // 1 row per page, 2 lines per row: 3 lines split as 2 + 1.
        let config = single_column(10, 2, 1);
        let engine = FlowEngine::new(config).unwrap();
        let mut provider = CountingProvider::new();
        let text = format!("{}{}{}", "a".repeat(10), "b".repeat(10), "c".repeat(10));
        let commands = engine
            .layout(&[Record::new(&text, "", "", "")], &mut provider)
            .await
            .unwrap();

        assert_eq!(provider.pages, 2);
        let texts: Vec<&str> = commands.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaaaaaaaa", "bbbbbbb...", "...ccccccc"]);
        assert_eq!(commands[2].page, PageHandle::new(1));
        assert_eq!(commands[2].y, 405.0 + 5.0);
    }

    #[tokio::test]
    async fn page_provision_failure_aborts_layout() {
        let config = single_column(10, 2, 1);
        let engine = FlowEngine::new(config).unwrap();
        let mut provider = CountingProvider {
            pages: 1,
            fail_after: Some(1),
        };
        let err = engine
            .layout(&[Record::new(&text_with_lines(5), "", "", "")], &mut provider)
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::PageProvision(_)));
    }

    #[tokio::test]
    async fn missing_first_page_is_an_error() {
        let engine = FlowEngine::new(TableLayoutConfig::default()).unwrap();
        let mut provider = CountingProvider { pages: 0, fail_after: None };
        let err = engine
            .layout(&[Record::default()], &mut provider)
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::InvalidPage(0)));
    }

    #[tokio::test]
    async fn custom_font_is_carried_into_commands() {
        let engine = FlowEngine::new(TableLayoutConfig::default())
            .unwrap()
            .with_font(FontRef::new("SpaceMono"));
        let mut provider = CountingProvider::new();
        let commands = engine.layout(&[Record::default()], &mut provider).await.unwrap();
        assert!(commands.iter().all(|c| c.font.name() == "SpaceMono"));
    }

    #[tokio::test]
    async fn free_function_validates_config() {
        let config = TableLayoutConfig {
            max_rows_per_page: 0,
            ..Default::default()
        };
        let mut provider = CountingProvider::new();
        let err = layout(&[Record::default()], &config, &mut provider).await.unwrap_err();
        assert!(matches!(err, FolioError::Config(_)));
    }
}
