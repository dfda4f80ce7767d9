//! `.docx` to HTML conversion for page import.
//!
//! Reads `word/document.xml` out of the archive and walks it once with a
//! pull parser. Paragraph styles decide the block element, run properties
//! decide inline emphasis. Tables, drawings and embedded objects are
//! skipped wholesale.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::error::ApiError;

/// Upper bound on the decompressed `document.xml`.
const MAX_DOCUMENT_XML_BYTES: u64 = 64 * 1024 * 1024;

/// Title used when nothing better is available.
pub const FALLBACK_TITLE: &str = "Imported document";

/// Category applied when the upload does not name one.
pub const DEFAULT_IMPORT_CATEGORY: &str = "imported";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("Uploaded file is not a .docx archive")]
    NotAnArchive,

    #[error("Archive has no word/document.xml")]
    MissingDocument,

    #[error("Document body exceeds {limit} bytes once decompressed")]
    DocumentTooLarge { limit: u64 },

    #[error("Malformed document XML: {reason}")]
    Malformed { reason: String },

    #[error("Document contains no text")]
    Empty,
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::invalid_input(err.to_string())
    }
}

/// Result of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedDocument {
    /// HTML fragment for the page body.
    pub html: String,
    /// Plain text of the first heading, if any.
    pub first_heading: Option<String>,
}

impl ImportedDocument {
    /// Pick a page title: explicit, then first heading, then file stem.
    pub fn resolve_title(&self, explicit: Option<&str>, file_name: Option<&str>) -> String {
        let non_blank = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        explicit
            .and_then(non_blank)
            .or_else(|| self.first_heading.as_deref().and_then(non_blank))
            .or_else(|| file_name.and_then(file_stem).and_then(non_blank))
            .unwrap_or_else(|| FALLBACK_TITLE.to_string())
    }
}

fn file_stem(name: &str) -> Option<&str> {
    // Browsers may send a full client path.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => Some(stem),
        _ => Some(base),
    }
}

/// Convert raw `.docx` bytes into an HTML fragment.
pub fn convert_docx(bytes: &[u8]) -> Result<ImportedDocument, ImportError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|_| ImportError::NotAnArchive)?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ImportError::MissingDocument)?;

    let mut xml = String::new();
    entry
        .take(MAX_DOCUMENT_XML_BYTES + 1)
        .read_to_string(&mut xml)
        .map_err(|e| ImportError::Malformed {
            reason: e.to_string(),
        })?;
    if xml.len() as u64 > MAX_DOCUMENT_XML_BYTES {
        return Err(ImportError::DocumentTooLarge {
            limit: MAX_DOCUMENT_XML_BYTES,
        });
    }

    convert_document_xml(&xml)
}

/// Convert the contents of `word/document.xml`.
pub fn convert_document_xml(xml: &str) -> Result<ImportedDocument, ImportError> {
    let mut reader = Reader::from_str(xml);
    let mut converter = Converter::default();

    loop {
        let event = reader.read_event().map_err(|e| ImportError::Malformed {
            reason: format!("at byte {}: {}", reader.buffer_position(), e),
        })?;
        match event {
            Event::Start(e) => converter.start(&e, false),
            Event::Empty(e) => converter.start(&e, true),
            Event::End(e) => converter.end(e.local_name().as_ref()),
            Event::Text(t) => {
                if converter.wants_text() {
                    let text = t.unescape().map_err(|e| ImportError::Malformed {
                        reason: e.to_string(),
                    })?;
                    converter.push_text(&text);
                }
            }
            Event::CData(t) => {
                if converter.wants_text() {
                    converter.push_text(&String::from_utf8_lossy(&t));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    converter.finish()
}

// ============================================================================
// CONVERTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading(u8),
    ListItem,
    Paragraph,
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    html: String,
    text: String,
}

#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    numbered: bool,
    html: String,
    text: String,
}

#[derive(Debug, Default)]
struct Run {
    bold: bool,
    italic: bool,
    underline: bool,
    html: String,
    text: String,
}

impl Run {
    fn render(&self) -> String {
        let mut out = String::new();
        if self.bold {
            out.push_str("<strong>");
        }
        if self.italic {
            out.push_str("<em>");
        }
        if self.underline {
            out.push_str("<u>");
        }
        out.push_str(&self.html);
        if self.underline {
            out.push_str("</u>");
        }
        if self.italic {
            out.push_str("</em>");
        }
        if self.bold {
            out.push_str("</strong>");
        }
        out
    }
}

#[derive(Debug, Default)]
struct Converter {
    blocks: Vec<Block>,
    paragraph: Option<Paragraph>,
    run: Option<Run>,
    /// Nesting depth inside tables, drawings and objects.
    skip_depth: usize,
    in_paragraph_props: bool,
    in_run_props: bool,
    in_text: bool,
}

fn is_skipped_container(local: &[u8]) -> bool {
    matches!(local, b"tbl" | b"drawing" | b"pict" | b"object")
}

/// `w:b`, `w:i` and `w:u` are on unless `w:val` says otherwise.
fn toggle_on(e: &BytesStart) -> bool {
    match attr_value(e, b"val") {
        Some(val) => !matches!(val.to_ascii_lowercase().as_str(), "0" | "false" | "none"),
        None => true,
    }
}

fn attr_value(e: &BytesStart, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn block_kind(paragraph: &Paragraph) -> BlockKind {
    if let Some(style) = paragraph.style.as_deref() {
        let lower = style.to_ascii_lowercase();
        if lower == "title" {
            return BlockKind::Heading(1);
        }
        if let Some(level) = lower.strip_prefix("heading") {
            if let Ok(n @ 1..=6) = level.trim().parse::<u8>() {
                return BlockKind::Heading(n);
            }
        }
        if lower == "listparagraph" {
            return BlockKind::ListItem;
        }
    }
    if paragraph.numbered {
        BlockKind::ListItem
    } else {
        BlockKind::Paragraph
    }
}

impl Converter {
    fn wants_text(&self) -> bool {
        self.skip_depth == 0 && self.in_text && self.run.is_some()
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.run.as_mut() {
            run.html.push_str(&quick_xml::escape::escape(text));
            run.text.push_str(text);
        }
    }

    fn start(&mut self, e: &BytesStart, empty: bool) {
        let name = e.local_name();
        let local = name.as_ref();

        if is_skipped_container(local) {
            if !empty {
                self.skip_depth += 1;
            }
            return;
        }
        if self.skip_depth > 0 {
            return;
        }

        match local {
            b"p" => {
                self.paragraph = Some(Paragraph::default());
                if empty {
                    self.end_paragraph();
                }
            }
            b"pPr" if !empty => self.in_paragraph_props = true,
            b"pStyle" if self.in_paragraph_props => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.style = attr_value(e, b"val");
                }
            }
            b"numPr" if self.in_paragraph_props => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.numbered = true;
                }
            }
            b"r" if !self.in_paragraph_props && self.paragraph.is_some() => {
                self.run = Some(Run::default());
                if empty {
                    self.end_run();
                }
            }
            b"rPr" if !empty && self.run.is_some() => self.in_run_props = true,
            b"b" if self.in_run_props => {
                if let Some(r) = self.run.as_mut() {
                    r.bold = toggle_on(e);
                }
            }
            b"i" if self.in_run_props => {
                if let Some(r) = self.run.as_mut() {
                    r.italic = toggle_on(e);
                }
            }
            b"u" if self.in_run_props => {
                if let Some(r) = self.run.as_mut() {
                    r.underline = toggle_on(e);
                }
            }
            b"t" if !empty && self.run.is_some() => self.in_text = true,
            b"tab" if self.run.is_some() && !self.in_run_props => {
                if let Some(r) = self.run.as_mut() {
                    r.html.push(' ');
                    r.text.push(' ');
                }
            }
            b"br" | b"cr" if self.run.is_some() && !self.in_run_props => {
                if let Some(r) = self.run.as_mut() {
                    r.html.push_str("<br>");
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, local: &[u8]) {
        if is_skipped_container(local) {
            self.skip_depth = self.skip_depth.saturating_sub(1);
            return;
        }
        if self.skip_depth > 0 {
            return;
        }

        match local {
            b"p" => self.end_paragraph(),
            b"pPr" => self.in_paragraph_props = false,
            b"r" => self.end_run(),
            b"rPr" => self.in_run_props = false,
            b"t" => self.in_text = false,
            _ => {}
        }
    }

    fn end_run(&mut self) {
        self.in_text = false;
        self.in_run_props = false;
        if let (Some(run), Some(paragraph)) = (self.run.take(), self.paragraph.as_mut()) {
            if !run.html.is_empty() {
                paragraph.html.push_str(&run.render());
                paragraph.text.push_str(&run.text);
            }
        }
    }

    fn end_paragraph(&mut self) {
        self.end_run();
        self.in_paragraph_props = false;
        let Some(paragraph) = self.paragraph.take() else {
            return;
        };
        if paragraph.text.trim().is_empty() {
            return;
        }
        self.blocks.push(Block {
            kind: block_kind(&paragraph),
            html: paragraph.html.trim().to_string(),
            text: paragraph.text.trim().to_string(),
        });
    }

    fn finish(self) -> Result<ImportedDocument, ImportError> {
        if self.blocks.is_empty() {
            return Err(ImportError::Empty);
        }

        let first_heading = self
            .blocks
            .iter()
            .find(|b| matches!(b.kind, BlockKind::Heading(_)))
            .map(|b| b.text.clone());

        let mut lines = Vec::with_capacity(self.blocks.len());
        let mut list: Vec<String> = Vec::new();
        for block in self.blocks {
            if block.kind != BlockKind::ListItem && !list.is_empty() {
                lines.push(format!("<ul>{}</ul>", list.concat()));
                list.clear();
            }
            match block.kind {
                BlockKind::Heading(n) => lines.push(format!("<h{n}>{}</h{n}>", block.html)),
                BlockKind::ListItem => list.push(format!("<li>{}</li>", block.html)),
                BlockKind::Paragraph => lines.push(format!("<p>{}</p>", block.html)),
            }
        }
        if !list.is_empty() {
            lines.push(format!("<ul>{}</ul>", list.concat()));
        }

        Ok(ImportedDocument {
            html: lines.join("\n"),
            first_heading,
        })
    }
}
