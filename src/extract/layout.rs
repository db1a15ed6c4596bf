// 📐 Positioned words and row grouping
//
// Fixed-column sources arrive as words with a horizontal span and a vertical
// offset. Rows are rebuilt by walking words in reading order and starting a
// new row whenever the vertical offset jumps by more than a tolerance.

/// A word with its horizontal span [x0, x1) and top edge
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, x0: f64, x1: f64, top: f64) -> Self {
        Word {
            text: text.into(),
            x0,
            x1,
            top,
        }
    }
}

/// Vertical distance between two text lines
pub const LINE_HEIGHT: f64 = 12.0;

/// Split layout-preserving text into words.
///
/// Character column is the horizontal offset, line number times
/// `LINE_HEIGHT` the vertical one. Form feeds separate pages; pages simply
/// continue the line count.
pub fn words_from_text(text: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut line_no = 0usize;

    for page in text.split('\u{c}') {
        for line in page.lines() {
            let top = line_no as f64 * LINE_HEIGHT;
            let mut start: Option<usize> = None;
            let mut current = String::new();

            for (col, ch) in line.chars().enumerate() {
                if ch.is_whitespace() {
                    if let Some(x0) = start.take() {
                        words.push(Word::new(std::mem::take(&mut current), x0 as f64, col as f64, top));
                    }
                } else {
                    if start.is_none() {
                        start = Some(col);
                    }
                    current.push(ch);
                }
            }
            if let Some(x0) = start {
                let x1 = x0 + current.chars().count();
                words.push(Word::new(current, x0 as f64, x1 as f64, top));
            }
            line_no += 1;
        }
    }

    words
}

/// Group words into rows, each sorted left to right
pub fn group_rows(words: &[Word], y_tolerance: f64) -> Vec<Vec<Word>> {
    let mut rows = Vec::new();
    let mut current: Vec<Word> = Vec::new();
    let mut previous_top: Option<f64> = None;

    for word in words {
        let new_row = match previous_top {
            None => true,
            Some(prev) => (word.top - prev).abs() > y_tolerance,
        };

        if new_row && !current.is_empty() {
            rows.push(sort_row(std::mem::take(&mut current)));
        }
        current.push(word.clone());
        previous_top = Some(word.top);
    }

    if !current.is_empty() {
        rows.push(sort_row(current));
    }

    rows
}

fn sort_row(mut row: Vec<Word>) -> Vec<Word> {
    row.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    row
}

/// True if any word in the row contains `needle`
pub fn row_contains(row: &[Word], needle: &str) -> bool {
    row.iter().any(|w| w.text.contains(needle))
}
