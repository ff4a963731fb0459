//! Structured error types for folio.
//!
//! The variants follow the failure sources of an export job: invalid
//! geometry, nothing to export, the page provider refusing a page, font
//! loading, JSON input, and plain I/O.

use thiserror::Error;

/// The unified error type returned by all public folio API functions.
#[derive(Debug, Error)]
pub enum FolioError {
    /// The table layout configuration is unusable. Fatal at construction.
    #[error("Invalid layout config: {0}")]
    Config(String),

    /// `layout` was called with zero records. No pages are produced.
    #[error("Nothing to export: no records given")]
    EmptyInput,

    /// The page provider could not supply a new page. The whole layout
    /// job is aborted and its draw commands must be discarded.
    #[error("Page provisioning failed: {0}")]
    PageProvision(String),

    /// A draw command or lookup referenced a page that does not exist.
    #[error("Page {0} does not exist")]
    InvalidPage(usize),

    /// A font could not be loaded, parsed, or embedded.
    #[error("Font error: {0}")]
    Font(String),

    /// JSON input failed to parse.
    #[error("Failed to parse input: {source}{}", fmt_hint(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => "Unexpected end of input. Is the JSON truncated?".to_string(),
            serde_json::error::Category::Io => String::new(),
        };
        FolioError::Parse { source: e, hint }
    }
}
