//! # Folio
//!
//! Lays curated chat question/answer exchanges into a paginated table and
//! writes it as a PDF.
//!
//! Every exchange becomes one record with four texts. The layout engine
//! wraps each text to its column's fixed character width, fits whole
//! records onto the page when it can, and splits a record across pages
//! with `"..."` continuation markers when it cannot. Pages come from a
//! provider that clones a template, so the engine never owns the document.
//!
//! ## Architecture
//!
//! ```text
//! Chat export (JSON)
//!       ↓
//!   [import]   Turns → question/answer pairs
//!       ↓
//!   [model]    Pairs → records
//!       ↓
//!   [layout]   Records → absolute draw commands, page requests
//!       ↓
//!   [pdf]      Template pages + draw commands → PDF bytes
//! ```
//!
//! [`export`] wires the stages together.

pub mod config;
pub mod error;
pub mod export;
pub mod font;
pub mod import;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod text;

pub use config::TableLayoutConfig;
pub use error::FolioError;
pub use export::{render_records, ExportOptions};
pub use layout::{layout, DrawCommand, FlowEngine, PageHandle, PageProvider};
pub use model::Record;
