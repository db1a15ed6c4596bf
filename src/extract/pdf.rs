// 📑 PDF text layer -> positioned words
//
// Walks each page's content stream and tracks just enough text state
// (matrices, font size, spacing) to place every shown glyph. Glyph widths
// are not read from font programs; each glyph advances a fixed fraction
// of the font size, which is close enough for column windows.
//
// Vertical offsets grow downward and pages stack, so the output feeds the
// same row grouping as layout text.

use super::layout::Word;
use crate::error::{Error, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};
use std::path::Path;

/// Estimated glyph advance, as a fraction of the font size
const GLYPH_WIDTH: f64 = 0.5;

/// TJ adjustments wider than this (thousandths of an em) split words
const WORD_GAP: f64 = 250.0;

/// Vertical room reserved per page
const PAGE_SPAN: f64 = 100_000.0;

// ============================================================================
// MATRICES
// ============================================================================

/// Affine matrix [a b c d e f], row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// self x other
    fn then(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    fn origin(&self) -> (f64, f64) {
        (self.0[4], self.0[5])
    }
}

// ============================================================================
// TEXT STATE
// ============================================================================

#[derive(Debug, Clone)]
struct PendingWord {
    text: String,
    x0: f64,
    x1: f64,
    top: f64,
}

struct PageText {
    ctm: Matrix,
    saved: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    page_offset: f64,
    current: Option<PendingWord>,
    words: Vec<Word>,
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Operand `i` as a number, zero when absent
fn operand(op: &Operation, i: usize) -> f64 {
    op.operands.get(i).and_then(number).unwrap_or(0.0)
}

fn matrix_operand(op: &Operation) -> Option<Matrix> {
    if op.operands.len() < 6 {
        return None;
    }
    let mut values = [0.0; 6];
    for (slot, object) in values.iter_mut().zip(&op.operands) {
        *slot = number(object)?;
    }
    Some(Matrix(values))
}

impl PageText {
    fn new(page_index: usize) -> Self {
        PageText {
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 10.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            page_offset: page_index as f64 * PAGE_SPAN,
            current: None,
            words: Vec::new(),
        }
    }

    fn device_point(&self) -> (f64, f64) {
        self.text_matrix.then(&self.ctm).origin()
    }

    fn flush(&mut self) {
        if let Some(word) = self.current.take() {
            self.words.push(Word::new(word.text, word.x0, word.x1, word.top));
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.flush();
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn advance(&mut self, tx: f64) {
        self.text_matrix = Matrix::translate(tx, 0.0).then(&self.text_matrix);
    }

    fn show_glyph(&mut self, ch: char) {
        let spacing = if ch == ' ' { self.char_spacing + self.word_spacing } else { self.char_spacing };
        let advance = (GLYPH_WIDTH * self.font_size + spacing) * self.horizontal_scale;

        if ch.is_whitespace() {
            self.flush();
            self.advance(advance);
            return;
        }

        let (x0, y) = self.device_point();
        self.advance(advance);
        let (x1, _) = self.device_point();
        let top = self.page_offset - y;

        match self.current.as_mut() {
            Some(word) => {
                word.text.push(ch);
                word.x1 = x1;
            }
            None => {
                self.current = Some(PendingWord {
                    text: ch.to_string(),
                    x0,
                    x1,
                    top,
                });
            }
        }
    }

    /// Latin-1 decoding; simple fonts in results sheets use single-byte encodings
    fn show_string(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.show_glyph(char::from(*byte));
        }
    }

    fn show_array(&mut self, items: &[Object]) {
        for item in items {
            match item {
                Object::String(bytes, _) => self.show_string(bytes),
                other => {
                    if let Some(adjust) = number(other) {
                        if adjust <= -WORD_GAP {
                            self.flush();
                        }
                        self.advance(-adjust / 1000.0 * self.font_size * self.horizontal_scale);
                    }
                }
            }
        }
    }

    fn apply(&mut self, op: &Operation) {
        match op.operator.as_str() {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                self.flush();
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(op) {
                    self.flush();
                    self.ctm = m.then(&self.ctm);
                }
            }
            "BT" => {
                self.flush();
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => self.flush(),
            "Tf" => self.font_size = operand(op, 1),
            "Tc" => self.char_spacing = operand(op, 0),
            "Tw" => self.word_spacing = operand(op, 0),
            "Tz" => self.horizontal_scale = operand(op, 0) / 100.0,
            "TL" => self.leading = operand(op, 0),
            "Td" => self.move_line(operand(op, 0), operand(op, 1)),
            "TD" => {
                self.leading = -operand(op, 1);
                self.move_line(operand(op, 0), operand(op, 1));
            }
            "Tm" => {
                if let Some(m) = matrix_operand(op) {
                    self.flush();
                    self.line_matrix = m;
                    self.text_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show_string(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show_string(bytes);
                }
            }
            "\"" => {
                self.word_spacing = operand(op, 0);
                self.char_spacing = operand(op, 1);
                self.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    self.show_string(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    self.show_array(items);
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Word> {
        self.flush();
        self.words
    }
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Positioned words of every page, in reading order (top to bottom, then
/// left to right)
pub fn words_from_pdf(path: &Path, bytes: &[u8]) -> Result<Vec<Word>> {
    let document = Document::load_mem(bytes).map_err(|e| Error::malformed(path, format!("unreadable PDF: {}", e)))?;

    let mut words = Vec::new();
    for (page_index, (page_no, page_id)) in document.get_pages().into_iter().enumerate() {
        let data = document
            .get_page_content(page_id)
            .map_err(|e| Error::malformed(path, format!("page {}: {}", page_no, e)))?;
        let content =
            Content::decode(&data).map_err(|e| Error::malformed(path, format!("page {}: {}", page_no, e)))?;

        let mut page = PageText::new(page_index);
        for op in &content.operations {
            page.apply(op);
        }
        words.extend(page.finish());
    }

    // Scanned sheets carry images only
    if words.is_empty() {
        return Err(Error::malformed(path, "PDF has no text layer"));
    }

    words.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0)));
    Ok(words)
}
