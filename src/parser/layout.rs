//! Text span extraction from PDF content streams.
//!
//! Walks the page content stream and records each shown text string with
//! its position and font size. Detection strategies consume these spans;
//! no paragraph or heading analysis happens here.

use std::collections::BTreeMap;

use lopdf::{Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};

/// A text span with position information.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Approximate width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a new text span. Width is estimated from the character count
    /// since glyph metrics are not decoded.
    pub fn new(text: String, x: f32, y: f32, font_size: f32) -> Self {
        let width = text.chars().count() as f32 * font_size * 0.5;
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    /// Right edge of the span.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Current text transformation state (Tm / Td / T*).
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    line_x: f32,
    line_y: f32,
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            line_x: 0.0,
            line_y: 0.0,
            leading: 12.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
        self.line_x = e;
        self.line_y = f;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.line_x += tx * self.a;
        self.line_y += ty * self.d;
        self.e = self.line_x;
        self.f = self.line_y;
        if ty != 0.0 {
            self.leading = -ty * self.d;
        }
    }

    fn next_line(&mut self) {
        self.line_y -= self.leading;
        self.e = self.line_x;
        self.f = self.line_y;
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        self.d.abs().max(0.01)
    }
}

/// Decode and concatenate a page's content streams.
pub(crate) fn page_content(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::PdfParse(e.to_string()))?;

    let contents = page_dict
        .get(b"Contents")
        .map_err(|e| Error::PdfParse(e.to_string()))?;

    match contents {
        Object::Reference(r) => {
            if let Ok(Object::Stream(s)) = doc.get_object(*r) {
                // Uncompressed streams have no /Filter and decompression
                // reports a missing key; use the raw content then.
                return Ok(s
                    .decompressed_content()
                    .unwrap_or_else(|_| s.content.clone()));
            }
            Err(Error::PdfParse("Invalid content stream".to_string()))
        }
        Object::Array(arr) => {
            let mut content = Vec::new();
            for obj in arr {
                if let Object::Reference(r) = obj {
                    if let Ok(Object::Stream(s)) = doc.get_object(*r) {
                        let data = s
                            .decompressed_content()
                            .unwrap_or_else(|_| s.content.clone());
                        content.extend_from_slice(&data);
                        content.push(b' ');
                    }
                }
            }
            Ok(content)
        }
        _ => Err(Error::PdfParse("Invalid content stream".to_string())),
    }
}

/// Parse a page's content stream into operations.
pub(crate) fn page_operations(
    doc: &LopdfDocument,
    page_id: ObjectId,
) -> Result<Vec<lopdf::content::Operation>> {
    let raw = page_content(doc, page_id)?;
    let content =
        lopdf::content::Content::decode(&raw).map_err(|e| Error::PdfParse(e.to_string()))?;
    Ok(content.operations)
}

/// Extract positioned text spans from one page.
pub fn extract_page_spans(doc: &LopdfDocument, page_num: u32) -> Result<Vec<TextSpan>> {
    let pages = doc.get_pages();
    let page_id = *pages
        .get(&page_num)
        .ok_or(Error::PageOutOfRange(page_num, pages.len() as u32))?;

    let lopdf_fonts = doc
        .get_page_fonts(page_id)
        .map_err(|e| Error::PdfParse(e.to_string()))?;

    let operations = page_operations(doc, page_id)?;
    Ok(collect_spans(doc, &operations, &lopdf_fonts))
}

fn collect_spans(
    doc: &LopdfDocument,
    operations: &[lopdf::content::Operation],
    fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut current_font_name: Vec<u8> = Vec::new();
    let mut current_font_size: f32 = 12.0;
    let mut text_matrix = TextMatrix::default();
    let mut in_text_block = false;

    for op in operations {
        match op.operator.as_str() {
            "BT" => {
                in_text_block = true;
                text_matrix = TextMatrix::default();
            }
            "ET" => {
                in_text_block = false;
            }
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Object::Name(font_name) = &op.operands[0] {
                        current_font_name = font_name.clone();
                    }
                    current_font_size = get_number(&op.operands[1]).unwrap_or(12.0);
                }
            }
            "TL" => {
                if let Some(leading) = op.operands.first().and_then(get_number) {
                    text_matrix.leading = leading;
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    text_matrix.translate(tx, ty);
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    text_matrix.set(
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    );
                }
            }
            "T*" => {
                text_matrix.next_line();
            }
            "Tj" | "TJ" => {
                if in_text_block {
                    // Look up the current font's encoding for byte decoding;
                    // fall back to simple decoding when unavailable.
                    let encoding = fonts
                        .get(&current_font_name)
                        .and_then(|f| f.get_font_encoding(doc).ok());
                    let decode = |bytes: &[u8]| {
                        if let Some(ref enc) = encoding {
                            if let Ok(text) = LopdfDocument::decode_text(enc, bytes) {
                                return text;
                            }
                        }
                        decode_text_simple(bytes)
                    };

                    let text = if op.operator == "TJ" {
                        decode_tj_array(op.operands.first(), decode)
                    } else if let Some(Object::String(bytes, _)) = op.operands.first() {
                        decode(bytes)
                    } else {
                        String::new()
                    };

                    if !text.trim().is_empty() {
                        let (x, y) = text_matrix.position();
                        let effective_size = current_font_size * text_matrix.scale();
                        spans.push(TextSpan::new(text, x, y, effective_size));
                    }
                }
            }
            "'" | "\"" => {
                text_matrix.next_line();
                if in_text_block {
                    let text_idx = if op.operator == "\"" { 2 } else { 0 };
                    if let Some(Object::String(bytes, _)) = op.operands.get(text_idx) {
                        let encoding = fonts
                            .get(&current_font_name)
                            .and_then(|f| f.get_font_encoding(doc).ok());
                        let text = if let Some(ref enc) = encoding {
                            LopdfDocument::decode_text(enc, bytes)
                                .unwrap_or_else(|_| decode_text_simple(bytes))
                        } else {
                            decode_text_simple(bytes)
                        };

                        if !text.trim().is_empty() {
                            let (x, y) = text_matrix.position();
                            let effective_size = current_font_size * text_matrix.scale();
                            spans.push(TextSpan::new(text, x, y, effective_size));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    spans
}

/// Decode a TJ operand array: strings interleaved with kerning adjustments.
/// Large negative adjustments (in 1/1000 text space units) indicate word
/// spaces in most fonts.
fn decode_tj_array(operand: Option<&Object>, decode: impl Fn(&[u8]) -> String) -> String {
    let Some(Object::Array(arr)) = operand else {
        return String::new();
    };

    let space_threshold = 200.0;
    let mut combined = String::new();

    for item in arr {
        match item {
            Object::String(bytes, _) => {
                combined.push_str(&decode(bytes));
            }
            Object::Integer(n) => {
                if -(*n as f32) > space_threshold && !combined.ends_with(' ') {
                    combined.push(' ');
                }
            }
            Object::Real(n) => {
                if -n > space_threshold && !combined.ends_with(' ') {
                    combined.push(' ');
                }
            }
            _ => {}
        }
    }

    combined
}

/// Simple text decoding fallback when no encoding is available.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    // Try UTF-8
    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Extract a number from a content stream operand.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
