//! # PDF Document Writer
//!
//! [`PdfDocument`] is both the page provider the flow engine draws on and
//! the serializer that turns those pages into a PDF 1.7 file.
//!
//! Pages are cloned from a [`PageTemplate`]. Draw commands are stored per
//! page in emission order and written out as text runs in fixed black.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, pages, content streams
//! ...
//! xref                <- byte offsets of every object
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! ## Font Embedding
//!
//! Standard fonts (Helvetica, Times-Roman, Courier) are plain Type1
//! references with WinAnsiEncoding. TrueType fonts are embedded whole as
//! CIDFontType2 with Identity-H encoding: FontFile2, FontDescriptor,
//! CIDFont, ToUnicode CMap, and the root Type0 dictionary.

pub mod template;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use async_trait::async_trait;
use miniz_oxide::deflate::compress_to_vec_zlib;
use tracing::debug;

use crate::config::PageSize;
use crate::error::FolioError;
use crate::font::{CustomFontMetrics, FontContext, FontData, FontRef};
use crate::layout::{DrawCommand, PageHandle, PageProvider};

pub use template::{PageTemplate, TemplateItem};

/// Document metadata embedded in the PDF info dictionary.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// A text fragment placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub font_size: f64,
    pub font: FontRef,
}

/// One physical page: its size, the template background, and the text
/// runs drawn onto it.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub width: f64,
    pub height: f64,
    pub background: Vec<TemplateItem>,
    pub label_font: FontRef,
    pub runs: Vec<TextRun>,
}

impl PdfPage {
    fn from_template(template: &PageTemplate) -> Self {
        Self {
            width: template.size.width,
            height: template.size.height,
            background: template.items.clone(),
            label_font: template.label_font.clone(),
            runs: Vec::new(),
        }
    }

    fn blank(size: PageSize) -> Self {
        Self::from_template(&PageTemplate::blank(size))
    }

    fn fonts_with_chars(&self, out: &mut BTreeMap<FontRef, BTreeSet<char>>) {
        for item in &self.background {
            if let TemplateItem::Label { text, .. } = item {
                out.entry(self.label_font.clone()).or_default().extend(text.chars());
            }
        }
        for run in &self.runs {
            out.entry(run.font.clone()).or_default().extend(run.text.chars());
        }
    }
}

/// Embedding data for a custom TrueType font.
struct CustomFontEmbedData {
    char_to_gid: HashMap<char, u16>,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<Vec<u8>>,
    /// Font references in resource order: `/F0`, `/F1`, ...
    font_objects: Vec<(FontRef, usize)>,
    custom_font_data: HashMap<FontRef, CustomFontEmbedData>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        self.objects.push(data);
        self.objects.len() - 1
    }

    fn push_stream(&mut self, dict_extra: &str, raw: &[u8]) -> usize {
        let compressed = compress_to_vec_zlib(raw, 6);
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< /Length {}{} /Filter /FlateDecode >>\nstream\n",
            compressed.len(),
            dict_extra
        );
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }

    fn font_index(&self, font: &FontRef) -> usize {
        self.font_objects
            .iter()
            .position(|(f, _)| f == font)
            .unwrap_or(0)
    }
}

/// An in-memory PDF made of template-cloned pages.
pub struct PdfDocument {
    template: Option<PageTemplate>,
    default_size: PageSize,
    pages: Vec<PdfPage>,
    fonts: FontContext,
    max_pages: Option<usize>,
}

impl PdfDocument {
    /// A document whose pages are clones of `template`. Page 0 exists
    /// immediately.
    pub fn from_template(template: PageTemplate) -> Self {
        let first = PdfPage::from_template(&template);
        Self {
            default_size: template.size,
            template: Some(template),
            pages: vec![first],
            fonts: FontContext::new(),
            max_pages: None,
        }
    }

    /// A document of blank pages of `size`. Page 0 exists immediately.
    pub fn blank(size: PageSize) -> Self {
        Self {
            template: None,
            default_size: size,
            pages: vec![PdfPage::blank(size)],
            fonts: FontContext::new(),
            max_pages: None,
        }
    }

    /// Refuse to grow beyond `limit` pages.
    pub fn with_max_pages(mut self, limit: usize) -> Self {
        self.max_pages = Some(limit);
        self
    }

    pub fn fonts(&self) -> &FontContext {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontContext {
        &mut self.fonts
    }

    pub fn pages(&self) -> &[PdfPage] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Store draw commands on their pages. Fails on a handle this document
    /// did not hand out, before any command is stored.
    pub fn apply(&mut self, commands: &[DrawCommand]) -> Result<(), FolioError> {
        if let Some(bad) = commands.iter().find(|c| c.page.index() >= self.pages.len()) {
            return Err(FolioError::InvalidPage(bad.page.index()));
        }
        for command in commands {
            self.pages[command.page.index()].runs.push(TextRun {
                x: command.x,
                y: command.y,
                text: command.text.clone(),
                font_size: command.font_size,
                font: command.font.clone(),
            });
        }
        Ok(())
    }

    /// Serialize all pages to PDF bytes.
    pub fn write(&self, metadata: &Metadata) -> Result<Vec<u8>, FolioError> {
        let mut builder = PdfBuilder {
            // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
            objects: vec![Vec::new(), Vec::new(), Vec::new()],
            font_objects: Vec::new(),
            custom_font_data: HashMap::new(),
        };

        self.register_fonts(&mut builder)?;

        let font_resources: String = builder
            .font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ");

        let mut page_obj_ids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let content = Self::build_content_stream(page, &builder);
            let content_obj_id = builder.push_stream("", content.as_bytes());
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << {} >> >> >>",
                page.width, page.height, content_obj_id, font_resources
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1] = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2] = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title ({}) ", escape_pdf_string(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author ({}) ", escape_pdf_string(author));
        }
        if let Some(ref subject) = metadata.subject {
            let _ = write!(info, "/Subject ({}) ", escape_pdf_string(subject));
        }
        info.push_str("/Producer (folio) /Creator (folio) >>");
        let info_obj_id = builder.push(info.into_bytes());

        debug!(pages = self.pages.len(), objects = builder.objects.len(), "serializing pdf");
        Ok(serialize(&builder, info_obj_id))
    }

    fn register_fonts(&self, builder: &mut PdfBuilder) -> Result<(), FolioError> {
        let mut font_chars: BTreeMap<FontRef, BTreeSet<char>> = BTreeMap::new();
        for page in &self.pages {
            page.fonts_with_chars(&mut font_chars);
        }
        if font_chars.is_empty() {
            font_chars.insert(FontRef::monospace(), BTreeSet::new());
        }

        for (font, chars) in &font_chars {
            let obj_id = match self.fonts.resolve(font) {
                FontData::Standard(std_font) => builder.push(
                    format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                        std_font.pdf_name()
                    )
                    .into_bytes(),
                ),
                FontData::Custom { data, metrics } => {
                    write_custom_font_objects(builder, font, data, metrics, chars)?
                }
            };
            builder.font_objects.push((font.clone(), obj_id));
        }
        Ok(())
    }

    fn build_content_stream(page: &PdfPage, builder: &PdfBuilder) -> String {
        let mut stream = String::new();

        for item in &page.background {
            match item {
                TemplateItem::Line { x1, y1, x2, y2, stroke } => {
                    let _ = write!(
                        stream,
                        "q\n0 0 0 RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                        stroke, x1, y1, x2, y2
                    );
                }
                TemplateItem::Rect { x, y, width, height, stroke } => {
                    let _ = write!(
                        stream,
                        "q\n0 0 0 RG\n{:.2} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                        stroke, x, y, width, height
                    );
                }
                TemplateItem::Label { .. } => {}
            }
        }

        let labels = page.background.iter().filter_map(|item| match item {
            TemplateItem::Label { x, y, size, text } => Some((*x, *y, *size, text.as_str(), &page.label_font)),
            _ => None,
        });
        let runs = page
            .runs
            .iter()
            .map(|r| (r.x, r.y, r.font_size, r.text.as_str(), &r.font));

        let mut texts = labels.chain(runs).peekable();
        if texts.peek().is_none() {
            return stream;
        }

        stream.push_str("BT\n0 0 0 rg\n");
        for (x, y, size, text, font) in texts {
            let _ = write!(
                stream,
                "/F{} {:.1} Tf\n1 0 0 1 {:.2} {:.2} Tm\n",
                builder.font_index(font),
                size,
                x,
                y
            );
            match builder.custom_font_data.get(font) {
                Some(embed) => {
                    let mut hex = String::new();
                    for ch in text.chars() {
                        let gid = embed.char_to_gid.get(&ch).copied().unwrap_or(0);
                        let _ = write!(hex, "{:04X}", gid);
                    }
                    let _ = writeln!(stream, "<{}> Tj", hex);
                }
                None => {
                    let _ = writeln!(stream, "({}) Tj", encode_winansi(text));
                }
            }
        }
        stream.push_str("ET\n");

        stream
    }
}

#[async_trait]
impl PageProvider for PdfDocument {
    fn page(&self, index: usize) -> Result<PageHandle, FolioError> {
        if index < self.pages.len() {
            Ok(PageHandle::new(index))
        } else {
            Err(FolioError::InvalidPage(index))
        }
    }

    async fn new_page(&mut self) -> Result<PageHandle, FolioError> {
        if let Some(limit) = self.max_pages {
            if self.pages.len() >= limit {
                return Err(FolioError::PageProvision(format!("page limit of {} reached", limit)));
            }
        }
        let page = match &self.template {
            Some(template) => PdfPage::from_template(template),
            None => PdfPage::blank(self.default_size),
        };
        self.pages.push(page);
        debug!(page = self.pages.len() - 1, "added page");
        Ok(PageHandle::new(self.pages.len() - 1))
    }
}

/// Write the five objects of an embedded TrueType font and return the id
/// of its Type0 root.
fn write_custom_font_objects(
    builder: &mut PdfBuilder,
    font: &FontRef,
    ttf_data: &[u8],
    metrics: &CustomFontMetrics,
    used_chars: &BTreeSet<char>,
) -> Result<usize, FolioError> {
    let face = ttf_parser::Face::parse(ttf_data, 0)
        .map_err(|e| FolioError::Font(format!("Failed to parse TTF data for font '{}': {}", font.name(), e)))?;

    let mut char_to_gid: HashMap<char, u16> = HashMap::new();
    for &ch in used_chars {
        if let Some(gid) = face.glyph_index(ch) {
            char_to_gid.insert(ch, gid.0);
        }
    }

    let pdf_font_name = sanitize_font_name(font.name());
    let scale = 1000.0 / metrics.units_per_em as f64;

    // 1. FontFile2 stream
    let fontfile2_id = builder.push_stream(&format!(" /Length1 {}", ttf_data.len()), ttf_data);

    // 2. FontDescriptor
    let [x_min, y_min, x_max, y_max] = metrics.bbox;
    let cap_height = metrics.cap_height.unwrap_or(metrics.ascender) as f64 * scale;
    let font_descriptor = format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags 5 \
         /FontBBox [{} {} {} {}] /ItalicAngle 0 \
         /Ascent {} /Descent {} /CapHeight {} /StemV 80 \
         /FontFile2 {} 0 R >>",
        pdf_font_name,
        (x_min as f64 * scale) as i32,
        (y_min as f64 * scale) as i32,
        (x_max as f64 * scale) as i32,
        (y_max as f64 * scale) as i32,
        (metrics.ascender as f64 * scale) as i32,
        (metrics.descender as f64 * scale) as i32,
        cap_height as i32,
        fontfile2_id,
    );
    let font_descriptor_id = builder.push(font_descriptor.into_bytes());

    // 3. CIDFont (DescendantFont)
    let default_width = face
        .glyph_hor_advance(ttf_parser::GlyphId(0))
        .map(|adv| (adv as f64 * scale) as u32)
        .unwrap_or(1000);
    let cidfont = format!(
        "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
         /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
         /FontDescriptor {} 0 R /DW {} /W {} /CIDToGIDMap /Identity >>",
        pdf_font_name,
        font_descriptor_id,
        default_width,
        build_w_array(&char_to_gid, &face, scale),
    );
    let cidfont_id = builder.push(cidfont.into_bytes());

    // 4. ToUnicode CMap
    let cmap = build_tounicode_cmap(&char_to_gid, &pdf_font_name);
    let tounicode_id = builder.push_stream("", cmap.as_bytes());

    // 5. Type0 root
    let type0 = format!(
        "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
         /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
        pdf_font_name, cidfont_id, tounicode_id,
    );
    let type0_id = builder.push(type0.into_bytes());

    builder
        .custom_font_data
        .insert(font.clone(), CustomFontEmbedData { char_to_gid });

    Ok(type0_id)
}

/// Per-glyph widths for a CIDFont: `[gid [width] gid [width] ...]`.
fn build_w_array(char_to_gid: &HashMap<char, u16>, face: &ttf_parser::Face, scale: f64) -> String {
    let gids: BTreeSet<u16> = char_to_gid.values().copied().collect();
    let mut result = String::from("[");
    for gid in gids {
        let advance = face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0);
        let _ = write!(result, " {} [{}]", gid, (advance as f64 * scale) as u32);
    }
    result.push_str(" ]");
    result
}

/// A ToUnicode CMap so text stays extractable and copyable.
fn build_tounicode_cmap(char_to_gid: &HashMap<char, u16>, font_name: &str) -> String {
    let mut gid_to_unicode: Vec<(u16, char)> = char_to_gid.iter().map(|(&ch, &gid)| (gid, ch)).collect();
    gid_to_unicode.sort();

    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    cmap.push_str("/CIDSystemInfo\n<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
    cmap.push_str("/CMapType 2 def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    // beginbfchar blocks hold at most 100 entries
    for chunk in gid_to_unicode.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for &(gid, ch) in chunk {
            let mut utf16 = [0u16; 2];
            let hex: String = ch.encode_utf16(&mut utf16).iter().map(|u| format!("{:04X}", u)).collect();
            let _ = writeln!(cmap, "<{:04X}> <{}>", gid, hex);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

/// Strip everything that is not valid in a PDF name object.
fn sanitize_font_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if sanitized.is_empty() {
        "CustomFont".to_string()
    } else {
        sanitized
    }
}

/// Escape special characters in a PDF string.
fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

/// Encode text as a WinAnsi PDF string body, escaping delimiters and
/// writing non-ASCII bytes as octal escapes.
fn encode_winansi(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match unicode_to_winansi(ch).unwrap_or(b'?') {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b @ 0x20..=0x7E => out.push(b as char),
            b => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

/// Map a Unicode codepoint to a WinAnsiEncoding (Windows-1252) byte.
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // Euro sign
        0x201A => Some(0x82), // Single low-9 quotation mark
        0x201E => Some(0x84), // Double low-9 quotation mark
        0x2026 => Some(0x85), // Horizontal ellipsis
        0x2018 => Some(0x91), // Left single quotation mark
        0x2019 => Some(0x92), // Right single quotation mark
        0x201C => Some(0x93), // Left double quotation mark
        0x201D => Some(0x94), // Right double quotation mark
        0x2022 => Some(0x95), // Bullet
        0x2013 => Some(0x96), // En dash
        0x2014 => Some(0x97), // Em dash
        0x2122 => Some(0x99), // Trade mark sign
        _ => None,
    }
}

/// Serialize all objects into the final PDF byte stream.
fn serialize(builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, data) in builder.objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let _ = write!(output, "{} 0 obj\n", i);
        output.extend_from_slice(data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
    output.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{:010} 00000 n \n", offset);
    }

    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        builder.objects.len(),
        info_obj_id,
        xref_offset
    );

    output
}
