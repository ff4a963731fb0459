//! # Page Templates
//!
//! A template is the background every page starts with: its size plus the
//! static vector and text items (grid lines, column headers) that frame the
//! table. New pages are clones of the template. Without a template a page
//! is blank at the configured default size.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{PageSize, TableLayoutConfig};
use crate::error::FolioError;
use crate::font::FontRef;

/// Horizontal advance of a monospace glyph, in ems.
const MONO_ADVANCE: f64 = 0.6;

fn default_stroke() -> f64 {
    0.5
}

/// A static item drawn on every page cloned from a template.
/// Coordinates are PDF points from the bottom-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TemplateItem {
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        #[serde(default = "default_stroke")]
        stroke: f64,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        #[serde(default = "default_stroke")]
        stroke: f64,
    },
    Label {
        x: f64,
        y: f64,
        size: f64,
        text: String,
    },
}

/// The blueprint new pages are cloned from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTemplate {
    #[serde(default)]
    pub size: PageSize,
    #[serde(default)]
    pub items: Vec<TemplateItem>,
    /// Font for `Label` items.
    #[serde(default)]
    pub label_font: FontRef,
}

impl PageTemplate {
    pub fn blank(size: PageSize) -> Self {
        Self {
            size,
            items: Vec::new(),
            label_font: FontRef::monospace(),
        }
    }

    /// The table frame for `config`: a header band with the column names
    /// and one horizontal rule per table row boundary.
    pub fn table_grid(config: &TableLayoutConfig) -> Self {
        let rows = config.max_rows_per_page;
        let top = config.start_y + config.text_padding + config.font_size;
        let bottom = top - rows as f64 * config.row_height;
        let header_size = config.font_size + 2.0;
        let header_top = top + header_size + 2.0 * config.text_padding;

        let left = config.start_x;
        let right = config
            .columns
            .iter()
            .map(|c| {
                left + c.offset_x + c.chars_per_line as f64 * config.font_size * MONO_ADVANCE
                    + 2.0 * config.text_padding
            })
            .fold(left, f64::max);

        let mut items = Vec::new();

        let horizontal = |y: f64| TemplateItem::Line {
            x1: left,
            y1: y,
            x2: right,
            y2: y,
            stroke: default_stroke(),
        };
        items.push(horizontal(header_top));
        for row in 0..=rows {
            items.push(horizontal(top - row as f64 * config.row_height));
        }

        let vertical = |x: f64| TemplateItem::Line {
            x1: x,
            y1: bottom,
            x2: x,
            y2: header_top,
            stroke: default_stroke(),
        };
        for column in &config.columns {
            items.push(vertical(left + column.offset_x));
        }
        items.push(vertical(right));

        for column in &config.columns {
            items.push(TemplateItem::Label {
                x: left + column.offset_x + config.text_padding,
                y: top + config.text_padding,
                size: header_size,
                text: column.name.clone(),
            });
        }

        Self {
            size: config.page_size,
            items,
            label_font: FontRef::monospace(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, FolioError> {
        let template: PageTemplate = serde_json::from_str(json)?;
        if !(template.size.width > 0.0 && template.size.height > 0.0) {
            return Err(FolioError::Config(format!(
                "template page size must be positive, got {}x{}",
                template.size.width, template.size.height
            )));
        }
        Ok(template)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FolioError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
