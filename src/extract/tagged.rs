// 🏷️ Row-tagged CSV extractor
//
// Timing exports mark sections with a tag in the first cell:
//   RESULTS,<group label>   begin results for a division group
//   SPLITS,<label>          begin a detail breakout (ignored)
//   END                     close the current section
// Inside a results section some exporters leave the first column blank,
// which shifts every field one slot to the right for that row only. A
// blank first cell can also just be a missing place, so the age slot
// decides which reading holds.

use super::columns::Field;
use super::{missing_field, non_empty, parse_age, parse_place, ExtractContext, ResultExtractor, ResultStream};
use crate::error::{open_source, Error, Result};
use crate::result::{Gender, RaceResult};
use crate::season::ResultFormat;
use csv::StringRecord;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Outside,
    Results,
    Detail,
}

#[derive(Debug, Clone)]
pub struct TaggedCsvExtractor {
    pub results_marker: String,
    pub detail_marker: String,
    pub end_marker: String,
    /// Column order of a data row with no leading blank
    pub layout: Vec<Field>,
}

impl TaggedCsvExtractor {
    pub fn new() -> Self {
        TaggedCsvExtractor {
            results_marker: "RESULTS".to_string(),
            detail_marker: "SPLITS".to_string(),
            end_marker: "END".to_string(),
            layout: vec![
                Field::Place,
                Field::Name,
                Field::Age,
                Field::Gender,
                Field::City,
                Field::State,
                Field::Time,
                Field::Pace,
            ],
        }
    }

    fn slot(&self, field: Field) -> Option<usize> {
        self.layout.iter().position(|f| *f == field)
    }
}

impl Default for TaggedCsvExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultExtractor for TaggedCsvExtractor {
    fn extract(&self, path: &Path, ctx: &ExtractContext) -> Result<ResultStream> {
        let file = open_source(path)?;
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        Ok(Box::new(TaggedRows {
            records: reader.into_records(),
            extractor: self.clone(),
            source: path.to_path_buf(),
            ctx: ctx.clone(),
            section: Section::Outside,
            line: 0,
            emitted: 0,
            failed: false,
        }))
    }

    fn format(&self) -> ResultFormat {
        ResultFormat::TaggedCsv
    }
}

// ============================================================================
// ROW STREAM
// ============================================================================

struct TaggedRows {
    records: csv::StringRecordsIntoIter<std::fs::File>,
    extractor: TaggedCsvExtractor,
    source: PathBuf,
    ctx: ExtractContext,
    section: Section,
    line: usize,
    emitted: u32,
    failed: bool,
}

impl TaggedRows {
    /// Section marker in the first non-empty cell, if any
    fn marker(&self, record: &StringRecord) -> Option<Section> {
        let first = record.iter().find(|c| !c.is_empty())?.to_uppercase();
        if first == self.extractor.results_marker {
            Some(Section::Results)
        } else if first == self.extractor.detail_marker {
            Some(Section::Detail)
        } else if first == self.extractor.end_marker {
            Some(Section::Outside)
        } else {
            None
        }
    }

    fn cell<'r>(&self, record: &'r StringRecord, shift: usize, field: Field) -> Option<&'r str> {
        let slot = self.extractor.slot(field)?;
        record.get(slot + shift).filter(|c| !c.is_empty())
    }

    /// 1 when a blank leading cell pushed this row right, else 0
    fn shift(&self, record: &StringRecord) -> usize {
        if !record.get(0).map_or(false, str::is_empty) {
            return 0;
        }
        let age_at = |shift| self.cell(record, shift, Field::Age).and_then(parse_age).is_some();
        match (age_at(0), age_at(1)) {
            (true, false) => 0,
            (false, true) => 1,
            _ => usize::from(record.len() > self.extractor.layout.len()),
        }
    }

    fn build(&self, record: &StringRecord) -> Result<Option<RaceResult>> {
        let shift = self.shift(record);
        let label = format!("line {}: {}", self.line, record.iter().collect::<Vec<_>>().join(","));

        // Repeated column headings inside a section
        if let Some(place) = self.cell(record, shift, Field::Place) {
            if Field::from_label(place) == Some(Field::Place) {
                return Ok(None);
            }
        }

        let name = self
            .cell(record, shift, Field::Name)
            .ok_or_else(|| missing_field(&self.source, &label, Field::Name))?;
        let time = self
            .cell(record, shift, Field::Time)
            .ok_or_else(|| missing_field(&self.source, &label, Field::Time))?;
        let age = self
            .cell(record, shift, Field::Age)
            .and_then(parse_age)
            .ok_or_else(|| missing_field(&self.source, &label, Field::Age))?;
        let gender = self
            .ctx
            .gender_or_fallback(self.cell(record, shift, Field::Gender).and_then(Gender::parse))
            .ok_or_else(|| missing_field(&self.source, &label, Field::Gender))?;

        let place = self
            .cell(record, shift, Field::Place)
            .and_then(parse_place)
            .unwrap_or(self.emitted + 1);

        Ok(Some(
            RaceResult::new(place, name.to_string(), time.to_string(), self.ctx.race_index)
                .with_pace(non_empty(self.cell(record, shift, Field::Pace)))
                .with_age(Some(age))
                .with_gender(Some(gender))
                .with_location(
                    non_empty(self.cell(record, shift, Field::City)),
                    non_empty(self.cell(record, shift, Field::State)),
                ),
        ))
    }
}

impl Iterator for TaggedRows {
    type Item = Result<RaceResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => {
                    // The reader cannot resync after a decode error
                    self.failed = true;
                    return Some(Err(Error::malformed(&self.source, e.to_string())));
                }
            };
            self.line += 1;

            if record.iter().all(str::is_empty) {
                continue;
            }

            if let Some(section) = self.marker(&record) {
                self.section = section;
                continue;
            }

            if self.section != Section::Results {
                continue;
            }

            match self.build(&record) {
                Ok(Some(result)) => {
                    self.emitted += 1;
                    return Some(Ok(result));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const EXPORT: &str = "\
Spring Classic 5K,Official Results
RESULTS,Female 30-39
Place,Name,Age,Gender,City,State,Time,Pace
1,Jane Doe,34,F,Rochester,MN,20:01,6:27
,2,Ann Lee,38,F,Byron,MN,21:15,6:51
SPLITS,Female 30-39 splits
1,Jane Doe,Mile 1,6:20,,,,
END
RESULTS,Male 40-49
3,Bob Smith,44,M,Austin,MN,19:40,6:20
";

    fn extract(text: &str, ctx: &ExtractContext) -> Vec<Result<RaceResult>> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        fs::write(&path, text).unwrap();
        TaggedCsvExtractor::new().extract(&path, ctx).unwrap().collect()
    }

    #[test]
    fn test_sections_and_shifted_rows() {
        let results: Vec<RaceResult> = extract(EXPORT, &ExtractContext::new(0))
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].name, "Jane Doe");
        assert_eq!(results[0].pace.as_deref(), Some("6:27"));

        // Leading blank cell shifted this row
        assert_eq!(results[1].place, 2);
        assert_eq!(results[1].name, "Ann Lee");
        assert_eq!(results[1].age, Some(38));
        assert_eq!(results[1].time, "21:15");

        assert_eq!(results[2].name, "Bob Smith");
        assert_eq!(results[2].gender, Some(Gender::Male));
    }

    #[test]
    fn test_detail_section_ignored() {
        let results = extract(EXPORT, &ExtractContext::new(0));
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .all(|r| r.time != "Mile 1" && r.age.is_some()));
    }

    #[test]
    fn test_rows_outside_sections_ignored() {
        let text = "1,Stray Row,30,M,Austin,MN,20:00,6:00\nRESULTS,All\n1,Jane Doe,34,F,Rochester,MN,20:01,6:27\n";
        let results = extract(text, &ExtractContext::new(0));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().name, "Jane Doe");
    }

    #[test]
    fn test_missing_age_is_row_error() {
        let text = "RESULTS,All\n1,Jane Doe,,F,Rochester,MN,20:01,6:27\n";
        let results = extract(text, &ExtractContext::new(0));
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::Format { .. })));
    }

    #[test]
    fn test_blank_gender_uses_fallback() {
        let text = "RESULTS,Women\n1,Jane Doe,34,,Rochester,MN,20:01,6:27\n";
        let ctx = ExtractContext::new(0).with_gender(Some(Gender::Female));
        let results = extract(text, &ctx);
        assert_eq!(results[0].as_ref().unwrap().gender, Some(Gender::Female));
    }

    #[test]
    fn test_blank_place_is_not_a_shift() {
        let text = "RESULTS,All\n,Jane Doe,34,F,Rochester,MN,20:01,6:27\n,Ann Lee,38,F,Byron,MN,21:15,6:51,\n";
        let results: Vec<RaceResult> = extract(text, &ExtractContext::new(0))
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Jane Doe");
        assert_eq!(results[0].age, Some(34));
        // No place: position in the section
        assert_eq!(results[0].place, 1);
        // A trailing empty cell does not make it a shift either
        assert_eq!(results[1].name, "Ann Lee");
        assert_eq!(results[1].place, 2);
    }

    #[test]
    fn test_shifted_row_without_pace() {
        let text = "RESULTS,All\n,4,Bob Smith,44,M,Austin,MN,19:40\n";
        let results = extract(text, &ExtractContext::new(0));
        let bob = results[0].as_ref().unwrap();
        assert_eq!(bob.place, 4);
        assert_eq!(bob.name, "Bob Smith");
        assert_eq!(bob.time, "19:40");
        assert_eq!(bob.pace, None);
    }

    #[test]
    fn test_missing_file() {
        let result = TaggedCsvExtractor::new().extract(Path::new("/nope/export.csv"), &ExtractContext::new(0));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
