// 📄 Fixed-column extractor
// PDF text layers and layout-preserving exports: no delimiters, only
// column positions established by a header row. Files starting with the
// PDF signature are read through the PDF text layer, anything else as text.

use super::columns::{ColumnSchema, Field};
use super::layout::{group_rows, row_contains, words_from_text, Word};
use super::pdf::words_from_pdf;
use super::{
    missing_column, missing_field, non_empty, parse_age, parse_place, ExtractContext, ResultExtractor, ResultStream,
};
use crate::config::GrandPrixConfig;
use crate::error::{read_source_bytes, Error, Result};
use crate::result::{Gender, RaceResult};
use crate::season::ResultFormat;
use std::path::{Path, PathBuf};

/// Rows holding this rule are table separators
const SEPARATOR: &str = "=======";

const PDF_SIGNATURE: &[u8] = b"%PDF";

#[derive(Debug, Clone)]
pub struct FixedColumnExtractor {
    pub row_tolerance: f64,
    pub min_row_tokens: usize,
    pub column_epsilon: f64,
}

impl FixedColumnExtractor {
    pub fn new() -> Self {
        FixedColumnExtractor::from_config(&GrandPrixConfig::default())
    }

    pub fn from_config(config: &GrandPrixConfig) -> Self {
        FixedColumnExtractor {
            row_tolerance: config.row_tolerance,
            min_row_tokens: config.min_row_tokens,
            column_epsilon: config.column_epsilon,
        }
    }

    /// Extract from already-positioned words (e.g. a PDF word dump)
    pub fn extract_words(&self, words: &[Word], source: &Path, ctx: &ExtractContext) -> ResultStream {
        let rows = group_rows(words, self.row_tolerance);
        Box::new(FixedColumnRows {
            rows: rows.into_iter(),
            schema: None,
            extractor: self.clone(),
            source: source.to_path_buf(),
            ctx: ctx.clone(),
            emitted: 0,
            failed: false,
        })
    }
}

impl Default for FixedColumnExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultExtractor for FixedColumnExtractor {
    fn extract(&self, path: &Path, ctx: &ExtractContext) -> Result<ResultStream> {
        let bytes = read_source_bytes(path)?;
        let words = if bytes.starts_with(PDF_SIGNATURE) {
            words_from_pdf(path, &bytes)?
        } else {
            let text = String::from_utf8(bytes).map_err(|_| Error::malformed(path, "file is not valid UTF-8"))?;
            words_from_text(&text)
        };
        Ok(self.extract_words(&words, path, ctx))
    }

    fn format(&self) -> ResultFormat {
        ResultFormat::FixedColumn
    }
}

// ============================================================================
// ROW STREAM
// ============================================================================

struct FixedColumnRows {
    rows: std::vec::IntoIter<Vec<Word>>,
    schema: Option<ColumnSchema>,
    extractor: FixedColumnExtractor,
    source: PathBuf,
    ctx: ExtractContext,
    emitted: u32,
    failed: bool,
}

impl FixedColumnRows {
    /// Every row needs name, time and age; gender too unless the file has a fallback
    fn check_schema(&self, schema: &ColumnSchema) -> Result<()> {
        let mut required = vec![Field::Name, Field::Time, Field::Age];
        if self.ctx.fallback_gender.is_none() {
            required.push(Field::Gender);
        }
        match required.into_iter().find(|field| !schema.has(*field)) {
            Some(field) => Err(missing_column(&self.source, field)),
            None => Ok(()),
        }
    }

    fn build(&self, row: &[Word], schema: &ColumnSchema) -> Result<RaceResult> {
        let label = row.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");

        let time = schema
            .value(row, Field::Time)
            .ok_or_else(|| missing_field(&self.source, &label, Field::Time))?;
        let name = schema
            .value(row, Field::Name)
            .ok_or_else(|| missing_field(&self.source, &label, Field::Name))?;
        let age_text = schema
            .value(row, Field::Age)
            .ok_or_else(|| missing_field(&self.source, &label, Field::Age))?;
        let age = parse_age(&age_text).ok_or_else(|| {
            Error::format(
                self.source.display().to_string(),
                format!("age '{}' is not a number in row: {}", age_text, label),
            )
        })?;
        let gender = self
            .ctx
            .gender_or_fallback(schema.value(row, Field::Gender).and_then(|g| Gender::parse(&g)))
            .ok_or_else(|| missing_field(&self.source, &label, Field::Gender))?;

        let place = schema
            .value(row, Field::Place)
            .and_then(|p| parse_place(&p))
            .unwrap_or(self.emitted + 1);

        Ok(RaceResult::new(place, name, time, self.ctx.race_index)
            .with_pace(non_empty(schema.value(row, Field::Pace).as_deref()))
            .with_age(Some(age))
            .with_gender(Some(gender))
            .with_location(
                non_empty(schema.value(row, Field::City).as_deref()),
                non_empty(schema.value(row, Field::State).as_deref()),
            ))
    }
}

impl Iterator for FixedColumnRows {
    type Item = Result<RaceResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let row = self.rows.next()?;

            // A header may repeat on every page; each one resets the columns
            if ColumnSchema::is_header(&row) {
                let schema = ColumnSchema::from_header(&row, self.extractor.column_epsilon);
                if let Err(e) = self.check_schema(&schema) {
                    self.failed = true;
                    return Some(Err(e));
                }
                self.schema = Some(schema);
                continue;
            }

            if row.len() < self.extractor.min_row_tokens || row_contains(&row, SEPARATOR) {
                continue;
            }

            let Some(schema) = self.schema.as_ref() else {
                continue;
            };

            let built = self.build(&row, schema);
            if built.is_ok() {
                self.emitted += 1;
            }
            return Some(built);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
