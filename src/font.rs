//! # Font Management
//!
//! Draw commands name their font through a [`FontRef`]. The PDF writer
//! resolves that name here: a standard PDF font needs no embedding, a
//! registered TrueType font is embedded. Any name that is not registered
//! falls back to Courier, the monospace standard font.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::FolioError;

/// Name of the font a draw command is rendered with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontRef(String);

impl FontRef {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// The monospace fallback every writer must support.
    pub fn monospace() -> Self {
        Self::new(StandardFont::Courier.pdf_name())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for FontRef {
    fn default() -> Self {
        Self::monospace()
    }
}

/// The standard PDF fonts folio can reference without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    TimesRoman,
    Courier,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::TimesRoman => "Times-Roman",
            Self::Courier => "Courier",
        }
    }
}

/// Parsed metrics of a TrueType font, used to build its PDF descriptors.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub cap_height: Option<i16>,
    pub bbox: [i16; 4],
}

impl CustomFontMetrics {
    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let bbox = face.global_bounding_box();
        Some(CustomFontMetrics {
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
            cap_height: face.capital_height(),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
        })
    }
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// A standard PDF font. No embedding needed.
    Standard(StandardFont),
    /// A TrueType font embedded into the document.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

static MONOSPACE_FALLBACK: FontData = FontData::Standard(StandardFont::Courier);

/// Maps font names to font data.
#[derive(Debug, Clone)]
pub struct FontContext {
    fonts: HashMap<String, FontData>,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();
        for font in [StandardFont::Helvetica, StandardFont::TimesRoman, StandardFont::Courier] {
            fonts.insert(font.pdf_name().to_string(), FontData::Standard(font));
        }
        Self { fonts }
    }

    /// Register a TrueType font under `name` and return its reference.
    pub fn register(&mut self, name: &str, data: Vec<u8>) -> Result<FontRef, FolioError> {
        let metrics = CustomFontMetrics::from_font_data(&data)
            .ok_or_else(|| FolioError::Font(format!("'{}' is not a parseable TrueType font", name)))?;
        self.fonts
            .insert(name.to_string(), FontData::Custom { data, metrics });
        Ok(FontRef::new(name))
    }

    /// Look up a font, falling back to Courier if not found.
    pub fn resolve(&self, font: &FontRef) -> &FontData {
        self.fonts
            .get(font.name())
            .unwrap_or(&MONOSPACE_FALLBACK)
    }

    pub fn is_registered(&self, font: &FontRef) -> bool {
        self.fonts.contains_key(font.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monospace_is_courier() {
        assert_eq!(FontRef::monospace().name(), "Courier");
        assert_eq!(FontRef::default(), FontRef::monospace());
    }

    #[test]
    fn standard_fonts_are_preregistered() {
        let ctx = FontContext::new();
        assert!(matches!(
            ctx.resolve(&FontRef::new("Helvetica")),
            FontData::Standard(StandardFont::Helvetica)
        ));
    }

    #[test]
    fn unknown_font_falls_back_to_courier() {
        let ctx = FontContext::new();
        assert!(!ctx.is_registered(&FontRef::new("SpaceMono")));
        assert!(matches!(
            ctx.resolve(&FontRef::new("SpaceMono")),
            FontData::Standard(StandardFont::Courier)
        ));
    }

    #[test]
    fn garbage_font_bytes_are_rejected() {
        let mut ctx = FontContext::new();
        let err = ctx.register("Broken", vec![0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, FolioError::Font(_)));
        assert!(!ctx.is_registered(&FontRef::new("Broken")));
    }
}
