//! Minimal fixed-layout PDF writer
//!
//! Produces PDF 1.4 documents on A4 pages using the built-in Helvetica and
//! Helvetica-Bold fonts with WinAnsi encoding. Layout is expressed in
//! millimetres from the top-left corner; the writer tracks a vertical cursor
//! and starts a new page whenever a cell would cross the bottom margin.

use std::io::Write;

use chrono::{DateTime, Utc};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::RenderError;

pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;
pub const MARGIN_MM: f64 = 10.0;
/// Cells that would end below this line go to the next page
pub const PAGE_BREAK_MM: f64 = PAGE_HEIGHT_MM - 20.0;
pub const CONTENT_WIDTH_MM: f64 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

const CELL_PADDING_MM: f64 = 1.0;
const RULE_WIDTH_MM: f64 = 0.2;
const PT_PER_MM: f64 = 72.0 / 25.4;

/// Glyph widths (1/1000 em) for ASCII 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a..m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n..z
    389, 280, 389, 584, // {..~
];

/// Approximate width for Latin-1 letters outside ASCII
const FALLBACK_WIDTH: u16 = 556;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }

    fn base_font(&self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
        }
    }

    fn glyph_width(&self, byte: u8) -> u16 {
        let table = match self {
            Self::Regular => &HELVETICA_WIDTHS,
            Self::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match byte {
            32..=126 => table[usize::from(byte - 32)],
            _ => FALLBACK_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Encode text as Latin-1 bytes
///
/// Characters above U+00FF and control characters have no glyph in the
/// standard fonts and are reported rather than replaced.
pub fn encode_latin1(context: &str, text: &str) -> Result<Vec<u8>, RenderError> {
    text.chars()
        .map(|ch| match u32::from(ch) {
            0x20..=0x7E | 0xA0..=0xFF => Ok(u32::from(ch) as u8),
            _ => Err(RenderError::UnencodableCharacter {
                context: context.to_string(),
                ch,
            }),
        })
        .collect()
}

/// Width of `text` in millimetres at `size` points
pub fn text_width_mm(font: Font, size: f64, text: &[u8]) -> f64 {
    let units: u32 = text.iter().map(|b| u32::from(font.glyph_width(*b))).sum();
    f64::from(units) * size / 1000.0 / PT_PER_MM
}

/// Append `text` as the body of a PDF literal string
fn escape_into(text: &[u8], out: &mut Vec<u8>) {
    for &byte in text {
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
}

/// Document metadata written to the Info dictionary
pub struct DocumentInfo {
    pub title: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Page-by-page content builder
pub struct PdfWriter {
    pages: Vec<Vec<u8>>,
    y: f64,
    font: Font,
    size: f64,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: MARGIN_MM,
            font: Font::Regular,
            size: 12.0,
        }
    }

    pub fn set_font(&mut self, font: Font, size: f64) {
        self.font = font;
        self.size = size;
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Current cursor position from the top of the page
    #[cfg(test)]
    pub fn y(&self) -> f64 {
        self.y
    }

    fn add_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = MARGIN_MM;
    }

    fn content(&mut self) -> &mut Vec<u8> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Write one line of text in a full-width cell and move below it
    pub fn cell(&mut self, height: f64, text: &[u8], align: Align) {
        if self.y + height > PAGE_BREAK_MM {
            self.add_page();
        }

        if !text.is_empty() {
            let x = match align {
                Align::Left => MARGIN_MM + CELL_PADDING_MM,
                Align::Center => {
                    MARGIN_MM + (CONTENT_WIDTH_MM - text_width_mm(self.font, self.size, text)) / 2.0
                }
            };
            let baseline = self.y + height / 2.0 + 0.3 * self.size / PT_PER_MM;

            let mut op = format!(
                "BT /{} {:.2} Tf {:.2} {:.2} Td (",
                self.font.resource(),
                self.size,
                x * PT_PER_MM,
                (PAGE_HEIGHT_MM - baseline) * PT_PER_MM
            )
            .into_bytes();
            escape_into(text, &mut op);
            op.extend_from_slice(b") Tj ET\n");
            self.content().extend_from_slice(&op);
        }

        self.y += height;
    }

    /// Move the cursor down without drawing
    pub fn ln(&mut self, height: f64) {
        self.y += height;
    }

    /// Horizontal rule across the content width at the cursor
    pub fn rule(&mut self) {
        if self.y > PAGE_BREAK_MM {
            self.add_page();
        }

        let y = (PAGE_HEIGHT_MM - self.y) * PT_PER_MM;
        let op = format!(
            "{:.2} w {:.2} {:.2} m {:.2} {:.2} l S\n",
            RULE_WIDTH_MM * PT_PER_MM,
            MARGIN_MM * PT_PER_MM,
            y,
            (PAGE_WIDTH_MM - MARGIN_MM) * PT_PER_MM,
            y
        );
        self.content().extend_from_slice(op.as_bytes());
    }

    /// Assemble the final document bytes
    pub fn finish(self, info: &DocumentInfo, compress: bool) -> Result<Vec<u8>, RenderError> {
        let page_count = self.pages.len();
        let mut doc = ObjectWriter::new();

        // Object numbers: 1 catalog, 2 page tree, 3-4 fonts, 5 info,
        // then (page, content) pairs starting at 6
        let kids: Vec<String> = (0..page_count)
            .map(|i| format!("{} 0 R", 6 + 2 * i))
            .collect();

        doc.object(b"<< /Type /Catalog /Pages 2 0 R >>");
        doc.object(
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 {:.2} {:.2}] >>",
                kids.join(" "),
                page_count,
                PAGE_WIDTH_MM * PT_PER_MM,
                PAGE_HEIGHT_MM * PT_PER_MM
            )
            .as_bytes(),
        );
        for font in [Font::Regular, Font::Bold] {
            doc.object(
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font.base_font()
                )
                .as_bytes(),
            );
        }

        let mut info_dict = b"<< /Title (".to_vec();
        escape_into(&info.title, &mut info_dict);
        info_dict.extend_from_slice(
            format!(
                ") /Producer (forecaster-core) /CreationDate (D:{}Z) >>",
                info.created_at.format("%Y%m%d%H%M%S")
            )
            .as_bytes(),
        );
        doc.object(&info_dict);

        for (i, content) in self.pages.into_iter().enumerate() {
            doc.object(
                format!(
                    "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                    7 + 2 * i
                )
                .as_bytes(),
            );

            if compress {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder
                    .write_all(&content)
                    .map_err(|e| RenderError::Compression(e.to_string()))?;
                let compressed = encoder
                    .finish()
                    .map_err(|e| RenderError::Compression(e.to_string()))?;
                doc.stream("/Filter /FlateDecode", &compressed);
            } else {
                doc.stream("", &content);
            }
        }

        Ok(doc.finish(5))
    }
}

/// Writes numbered objects and remembers their byte offsets for the xref table
struct ObjectWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn new() -> Self {
        let mut out = Vec::with_capacity(4096);
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            out,
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self) {
        self.offsets.push(self.out.len());
        let header = format!("{} 0 obj\n", self.offsets.len());
        self.out.extend_from_slice(header.as_bytes());
    }

    fn object(&mut self, body: &[u8]) {
        self.begin();
        self.out.extend_from_slice(body);
        self.out.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, extra: &str, data: &[u8]) {
        self.begin();
        let dict = if extra.is_empty() {
            format!("<< /Length {} >>\nstream\n", data.len())
        } else {
            format!("<< /Length {} {} >>\nstream\n", data.len(), extra)
        };
        self.out.extend_from_slice(dict.as_bytes());
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self, info_object: usize) -> Vec<u8> {
        let xref_offset = self.out.len();
        let size = self.offsets.len() + 1;

        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for offset in &self.offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, info_object, xref_offset
        ));
        self.out.extend_from_slice(xref.as_bytes());
        self.out
    }
}
