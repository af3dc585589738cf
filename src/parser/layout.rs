//! Positioned text spans from page content streams.
//!
//! Only what the structural table detector needs is tracked: where each
//! shown string starts, its font size and an estimated advance width.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};

/// Average glyph advance as a fraction of the font size, used when no
/// widths are read from the font.
const AVG_GLYPH_ADVANCE: f32 = 0.5;

/// A text span with position and size information.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Estimated width of the text
    pub width: f32,
    /// Effective font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a span, estimating its width from the character count.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = estimate_width(&text, font_size);
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Approximate top of the glyphs.
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }

    /// Approximate bottom including descenders.
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }
}

/// Estimated advance width; full-width scripts take a whole em per glyph.
pub fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .map(|c| {
            if is_spaceless_script_char(c) {
                1.0
            } else {
                AVG_GLYPH_ADVANCE
            }
        })
        .sum::<f32>()
        * font_size
}

/// Extract text spans from one page of a loaded document.
pub fn extract_page_spans(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<TextSpan>> {
    let fonts = doc
        .get_page_fonts(page_id)
        .map_err(|e| Error::PdfParse(e.to_string()))?;

    let data = doc
        .get_page_content(page_id)
        .map_err(|e| Error::PdfParse(e.to_string()))?;
    let content = Content::decode(&data).map_err(|e| Error::PdfParse(e.to_string()))?;

    let mut collector = SpanCollector::new(doc, &fonts);
    for op in &content.operations {
        collector.apply(op);
    }
    Ok(collector.spans)
}

/// Walks content stream operations and records shown strings.
struct SpanCollector<'a> {
    doc: &'a LopdfDocument,
    fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary>,
    font: Vec<u8>,
    font_size: f32,
    leading: f32,
    matrix: TextMatrix,
    in_text: bool,
    spans: Vec<TextSpan>,
}

impl<'a> SpanCollector<'a> {
    fn new(doc: &'a LopdfDocument, fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary>) -> Self {
        Self {
            doc,
            fonts,
            font: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            matrix: TextMatrix::default(),
            in_text: false,
            spans: Vec::new(),
        }
    }

    fn apply(&mut self, op: &Operation) {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                self.in_text = true;
                self.matrix = TextMatrix::default();
            }
            "ET" => self.in_text = false,
            "Tf" => {
                if let [Object::Name(name), size, ..] = operands.as_slice() {
                    self.font = name.clone();
                    self.font_size = get_number(size).unwrap_or(12.0);
                }
            }
            "TL" => {
                if let Some(tl) = operands.first().and_then(get_number) {
                    self.leading = tl;
                }
            }
            "Td" => {
                if let [tx, ty, ..] = operands.as_slice() {
                    self.matrix
                        .translate(get_number(tx).unwrap_or(0.0), get_number(ty).unwrap_or(0.0));
                }
            }
            "TD" => {
                if let [tx, ty, ..] = operands.as_slice() {
                    let ty = get_number(ty).unwrap_or(0.0);
                    self.leading = -ty;
                    self.matrix.translate(get_number(tx).unwrap_or(0.0), ty);
                }
            }
            "Tm" => {
                if operands.len() >= 6 {
                    let v: Vec<f32> = operands[..6]
                        .iter()
                        .map(|o| get_number(o).unwrap_or(0.0))
                        .collect();
                    self.matrix = TextMatrix::from_components(v[0], v[1], v[2], v[3], v[4], v[5]);
                }
            }
            "T*" => self.matrix.next_line(self.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = self.decode(bytes);
                    self.push(text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let text = self.decode_array(items);
                    self.push(text);
                }
            }
            "'" => {
                self.matrix.next_line(self.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = self.decode(bytes);
                    self.push(text);
                }
            }
            "\"" => {
                self.matrix.next_line(self.leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    let text = self.decode(bytes);
                    self.push(text);
                }
            }
            _ => {}
        }
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let encoding = self
            .fonts
            .get(&self.font)
            .and_then(|f| f.get_font_encoding(self.doc).ok());
        match encoding {
            Some(enc) => LopdfDocument::decode_text(&enc, bytes).unwrap_or_default(),
            None => decode_text_simple(bytes),
        }
    }

    /// Decode a TJ array; large negative kerning becomes a word space.
    fn decode_array(&self, items: &[Object]) -> String {
        const SPACE_ADJUSTMENT: f32 = 200.0;
        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => combined.push_str(&self.decode(bytes)),
                other => {
                    let Some(n) = get_number(other) else { continue };
                    let wants_space = -n > SPACE_ADJUSTMENT
                        && combined
                            .chars()
                            .last()
                            .is_some_and(|c| !c.is_whitespace() && !is_spaceless_script_char(c));
                    if wants_space {
                        combined.push(' ');
                    }
                }
            }
        }
        combined
    }

    fn push(&mut self, text: String) {
        if !self.in_text || text.trim().is_empty() {
            return;
        }
        let (x, y) = self.matrix.position();
        let size = self.font_size * self.matrix.scale();
        self.spans.push(TextSpan::new(text, x, y, size));
    }
}

/// Text matrix for tracking position in a content stream.
#[derive(Debug, Clone, Copy)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self::from_components(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }
}

impl TextMatrix {
    fn from_components(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn next_line(&mut self, leading: f32) {
        // Producers that never set TL still expect a line break.
        let leading = if leading == 0.0 { 12.0 } else { leading };
        self.translate(0.0, -leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Scripts written without word spaces (Han, kana, CJK punctuation).
///
/// Hangul is deliberately absent: Korean uses word spaces.
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2EBEF
        | 0x3040..=0x30FF
        | 0x3000..=0x303F
        | 0xFF00..=0xFFEF)
}

/// Decoding fallback for fonts without a usable encoding.
fn decode_text_simple(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::StringFormat;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn collect(ops: Vec<Operation>) -> Vec<TextSpan> {
        let doc = LopdfDocument::new();
        let fonts = BTreeMap::new();
        let mut collector = SpanCollector::new(&doc, &fonts);
        for o in &ops {
            collector.apply(o);
        }
        collector.spans
    }

    fn string(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    }

    #[test]
    fn test_span_positions_follow_td_and_tstar() {
        let spans = collect(vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), 10.into()]),
            op("TL", vec![14.into()]),
            op("Td", vec![72.into(), 700.into()]),
            op("Tj", vec![string("Name")]),
            op("T*", vec![]),
            op("Tj", vec![string("Alice")]),
            op("ET", vec![]),
        ]);

        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].x, spans[0].y), (72.0, 700.0));
        assert_eq!((spans[1].x, spans[1].y), (72.0, 686.0));
        assert!((spans[0].width - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_text_outside_bt_is_ignored() {
        let spans = collect(vec![op("Tj", vec![string("stray")])]);
        assert!(spans.is_empty());
    }

    #[test]
    fn test_tj_array_inserts_word_space() {
        let spans = collect(vec![
            op("BT", vec![]),
            op(
                "TJ",
                vec![Object::Array(vec![
                    string("Total"),
                    Object::Integer(-250),
                    string("cost"),
                    Object::Integer(-30),
                    string("s"),
                ])],
            ),
            op("ET", vec![]),
        ]);
        assert_eq!(spans[0].text, "Total costs");
    }

    #[test]
    fn test_tm_scales_font_size() {
        let spans = collect(vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), 1.into()]),
            op(
                "Tm",
                vec![
                    12.into(),
                    0.into(),
                    0.into(),
                    12.into(),
                    100.into(),
                    500.into(),
                ],
            ),
            op("Tj", vec![string("x")]),
            op("ET", vec![]),
        ]);
        assert_eq!(spans[0].font_size, 12.0);
        assert_eq!((spans[0].x, spans[0].y), (100.0, 500.0));
    }

    #[test]
    fn test_estimate_width_full_width_glyphs() {
        assert_eq!(estimate_width("ab", 10.0), 10.0);
        assert_eq!(estimate_width("表格", 10.0), 20.0);
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41]), "A");
        assert_eq!(decode_text_simple(b"plain"), "plain");
        assert_eq!(decode_text_simple(&[0xE9]), "é");
    }
}
