//! # Table Layout Configuration
//!
//! Static geometry for the export table: where the grid starts, how tall a
//! row is, how many rows fit on a page, and per-column offsets and wrap
//! widths. All coordinates are PDF points with the origin at the bottom-left
//! of the page, so `start_y` is measured from the bottom.
//!
//! A config is validated once, when the flow engine is constructed. An
//! invalid config never reaches the layout loop.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FolioError;

/// Wrap width shared by the four shipped columns.
const CHARS_PER_LINE: usize = 57;
/// Horizontal distance between the shipped columns.
const COLUMN_SPACING: f64 = 179.0;

/// One table column: its header label, its x offset from `start_x`, and
/// how many characters fit on one of its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub name: String,
    pub offset_x: f64,
    pub chars_per_line: usize,
}

impl ColumnDef {
    pub fn new(name: &str, offset_x: f64, chars_per_line: usize) -> Self {
        Self {
            name: name.to_string(),
            offset_x,
            chars_per_line,
        }
    }
}

/// Physical page size in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// A4 in landscape orientation.
    pub const A4_LANDSCAPE: PageSize = PageSize {
        width: 841.92,
        height: 595.32,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4_LANDSCAPE
    }
}

/// Values substituted for missing record data when building records from
/// chat pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldMapping {
    /// Used for an absent rationale, evaluation, or model tag.
    pub placeholder: String,
    /// Used when a pair has no question text.
    pub empty_question: String,
    /// `chrono` format string for the date appended to each question.
    pub date_format: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            placeholder: "-".to_string(),
            empty_question: "(Kein Text)".to_string(),
            date_format: "%d.%m.%Y".to_string(),
        }
    }
}

/// Geometry of the export table. Constructed once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableLayoutConfig {
    /// X position where the table begins.
    pub start_x: f64,
    /// Y position of the first row, measured from the bottom of the page.
    pub start_y: f64,
    /// Height of one table row.
    pub row_height: f64,
    /// Table rows per page.
    pub max_rows_per_page: usize,
    /// Distance from the cell edge to its text.
    pub text_padding: f64,
    pub font_size: f64,
    /// Extra space between two text lines, on top of `font_size`.
    pub line_spacing: f64,
    /// Wrapped text lines that make up one table row.
    pub lines_per_row: usize,
    pub columns: Vec<ColumnDef>,
    pub page_size: PageSize,
    pub field_mapping: FieldMapping,
}

impl Default for TableLayoutConfig {
    fn default() -> Self {
        Self {
            start_x: 52.0,
            start_y: 405.0,
            row_height: 39.0,
            max_rows_per_page: 8,
            text_padding: 5.0,
            font_size: 5.0,
            line_spacing: 0.0,
            lines_per_row: 7,
            columns: vec![
                ColumnDef::new("Anfrage", 0.0, CHARS_PER_LINE),
                ColumnDef::new("Grund", COLUMN_SPACING, CHARS_PER_LINE),
                ColumnDef::new("Bewertung", 2.0 * COLUMN_SPACING, CHARS_PER_LINE),
                ColumnDef::new("Version", 3.0 * COLUMN_SPACING, CHARS_PER_LINE),
            ],
            page_size: PageSize::default(),
            field_mapping: FieldMapping::default(),
        }
    }
}

impl TableLayoutConfig {
    /// Vertical distance between two consecutive text lines.
    pub fn line_height(&self) -> f64 {
        self.font_size + self.line_spacing
    }

    /// Parse a config from JSON. Missing keys take the shipped defaults.
    /// The result is validated.
    pub fn from_json(json: &str) -> Result<Self, FolioError> {
        let config: TableLayoutConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FolioError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check every value the layout arithmetic depends on.
    pub fn validate(&self) -> Result<(), FolioError> {
        positive("rowHeight", self.row_height)?;
        positive("fontSize", self.font_size)?;
        positive("pageSize.width", self.page_size.width)?;
        positive("pageSize.height", self.page_size.height)?;
        non_negative("startX", self.start_x)?;
        non_negative("startY", self.start_y)?;
        non_negative("textPadding", self.text_padding)?;
        non_negative("lineSpacing", self.line_spacing)?;

        if self.max_rows_per_page == 0 {
            return Err(FolioError::Config("maxRowsPerPage must be > 0".to_string()));
        }
        if self.lines_per_row == 0 {
            return Err(FolioError::Config("linesPerRow must be > 0".to_string()));
        }
        if self.columns.is_empty() {
            return Err(FolioError::Config("at least one column is required".to_string()));
        }
        for column in &self.columns {
            if column.chars_per_line == 0 {
                return Err(FolioError::Config(format!(
                    "column '{}': charsPerLine must be > 0",
                    column.name
                )));
            }
            non_negative(&format!("column '{}' offsetX", column.name), column.offset_x)?;
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<(), FolioError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FolioError::Config(format!("{} must be > 0, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), FolioError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FolioError::Config(format!("{} must be >= 0, got {}", name, value)))
    }
}
