//! # Export Pipeline
//!
//! Records in, PDF bytes out: build the engine, provision pages from the
//! template, lay out, apply the draw commands and serialize.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use tracing::info;

use crate::config::{FieldMapping, TableLayoutConfig};
use crate::error::FolioError;
use crate::layout::FlowEngine;
use crate::model::{ChatPair, Record};
use crate::pdf::{Metadata, PageTemplate, PdfDocument};

/// Name a custom font is registered under for an export.
pub const CUSTOM_FONT_NAME: &str = "ExportMono";

/// Everything an export needs besides its records.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub config: TableLayoutConfig,
    /// Page background. `None` draws the table grid of `config`.
    pub template: Option<PageTemplate>,
    /// TrueType bytes for a monospace font to use instead of Courier.
    pub font: Option<Vec<u8>>,
    pub metadata: Metadata,
    pub max_pages: Option<usize>,
}

/// Lay out `records` onto a fresh document and return it unserialized.
pub async fn layout_document(records: &[Record], options: &ExportOptions) -> Result<PdfDocument, FolioError> {
    let mut engine = FlowEngine::new(options.config.clone())?;

    let template = options
        .template
        .clone()
        .unwrap_or_else(|| PageTemplate::table_grid(&options.config));
    let mut document = PdfDocument::from_template(template);
    if let Some(limit) = options.max_pages {
        document = document.with_max_pages(limit);
    }
    if let Some(bytes) = &options.font {
        let font = document.fonts_mut().register(CUSTOM_FONT_NAME, bytes.clone())?;
        engine = engine.with_font(font);
    }

    let commands = engine.layout(records, &mut document).await?;
    document.apply(&commands)?;

    info!(
        records = records.len(),
        pages = document.page_count(),
        commands = commands.len(),
        "laid out export"
    );
    Ok(document)
}

/// Render `records` to PDF bytes.
pub async fn render_records(records: &[Record], options: &ExportOptions) -> Result<Vec<u8>, FolioError> {
    let document = layout_document(records, options).await?;
    document.write(&options.metadata)
}

/// The rows of an export, one per pair, in order. With `selected_only`,
/// pairs the user did not select are left out.
pub fn records_from_pairs(
    pairs: &[ChatPair],
    today: NaiveDate,
    mapping: &FieldMapping,
    selected_only: bool,
) -> Vec<Record> {
    pairs
        .iter()
        .filter(|pair| !selected_only || pair.selected)
        .map(|pair| Record::from_pair(pair, today, mapping))
        .collect()
}

/// `chatgpt-export-2026-03-09T14-05-12-345Z.pdf` for an export started at
/// `now`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("chatgpt-export-{}.pdf", stamp)
}
