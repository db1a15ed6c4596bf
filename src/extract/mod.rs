// 🏗️ Extraction Framework
// One trait, four source formats, one normalized RaceResult stream.
//
// Extractors fail up front for file-level problems (missing file, corrupt
// encoding, no usable columns) and yield per-row errors inside the stream so
// the caller can log and skip a single bad row.

pub mod columns;
pub mod feed;
pub mod fixed;
pub mod layout;
pub mod pdf;
pub mod tagged;

use crate::config::GrandPrixConfig;
use crate::error::{Error, Result};
use crate::result::{Gender, RaceResult};
use crate::season::{Race, ResultFormat};
use std::path::Path;
use tracing::{info, warn};

pub use columns::{ColumnSchema, Field};
pub use feed::{IndexedFeedExtractor, RecordFeedExtractor};
pub use fixed::FixedColumnExtractor;
pub use layout::Word;
pub use tagged::TaggedCsvExtractor;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Lazy, finite, single-pass stream of extracted rows
pub type ResultStream = Box<dyn Iterator<Item = Result<RaceResult>>>;

/// What an extractor needs to know besides the file itself
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractContext {
    pub race_index: usize,
    /// Gender for single-gender files; fills a missing gender field
    pub fallback_gender: Option<Gender>,
    /// Used to derive pace when a source only has durations
    pub distance_miles: Option<f64>,
}

impl ExtractContext {
    pub fn new(race_index: usize) -> Self {
        ExtractContext {
            race_index,
            fallback_gender: None,
            distance_miles: None,
        }
    }

    pub fn with_gender(mut self, gender: Option<Gender>) -> Self {
        self.fallback_gender = gender;
        self
    }

    pub fn with_distance(mut self, distance_miles: Option<f64>) -> Self {
        self.distance_miles = distance_miles;
        self
    }

    /// Source gender wins; the caller-supplied one fills the gap
    pub fn gender_or_fallback(&self, source: Option<Gender>) -> Option<Gender> {
        source.or(self.fallback_gender)
    }
}

/// ResultExtractor - the one interface every source format implements
pub trait ResultExtractor: Send + Sync {
    /// Open `path` and return its rows in source order
    fn extract(&self, path: &Path, ctx: &ExtractContext) -> Result<ResultStream>;

    fn format(&self) -> ResultFormat;
}

/// Get the extractor for a declared format
pub fn get_extractor(format: ResultFormat, config: &GrandPrixConfig) -> Box<dyn ResultExtractor> {
    match format {
        ResultFormat::FixedColumn => Box::new(FixedColumnExtractor::from_config(config)),
        ResultFormat::TaggedCsv => Box::new(TaggedCsvExtractor::new()),
        ResultFormat::IndexedFeed => Box::new(IndexedFeedExtractor::new()),
        ResultFormat::RecordFeed => Box::new(RecordFeedExtractor::new()),
    }
}

// ============================================================================
// RACE-LEVEL DRIVER
// ============================================================================

/// Extract every source file of a race and concatenate them (male file first
/// for split races). File-level errors abort; row-level errors are logged
/// and skipped.
pub fn extract_race(race: &Race, config: &GrandPrixConfig) -> Result<Vec<RaceResult>> {
    let extractor = get_extractor(race.format, config);
    let mut results = Vec::new();

    for source in &race.sources {
        let ctx = ExtractContext::new(race.index)
            .with_gender(source.gender)
            .with_distance(race.distance_miles);

        let mut skipped = 0usize;
        for row in extractor.extract(&source.path, &ctx)? {
            match row {
                Ok(result) => results.push(result),
                Err(e) if e.is_per_record() => {
                    warn!(race = %race.name, file = %source.path.display(), error = %e, "Skipping result row");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            race = %race.name,
            file = %source.path.display(),
            format = race.format.name(),
            skipped,
            "Extracted results"
        );
    }

    Ok(results)
}

// ============================================================================
// SHARED FIELD HELPERS
// ============================================================================

/// Positive integer place, if the text holds one ("12", "12.", "#12")
pub(crate) fn parse_place(text: &str) -> Option<u32> {
    let digits = text.trim().trim_start_matches('#').trim_end_matches('.');
    digits.parse::<u32>().ok().filter(|p| *p > 0)
}

pub(crate) fn parse_age(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok().filter(|a| *a < 130)
}

/// Trimmed, non-empty text
pub(crate) fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Render seconds as "m:ss" or "h:mm:ss"
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Pace per mile for a duration over a distance
pub fn pace_per_mile(seconds: f64, distance_miles: f64) -> Option<String> {
    if distance_miles <= 0.0 || seconds <= 0.0 {
        return None;
    }
    Some(format_duration(seconds / distance_miles))
}

/// Error for a row whose mandatory field is missing
pub(crate) fn missing_field(path: &Path, row_label: &str, field: Field) -> Error {
    Error::format(
        path.display().to_string(),
        format!("no {} in row: {}", field.name(), row_label),
    )
}

/// File-level error for a layout without a mandatory column
pub(crate) fn missing_column(path: &Path, field: Field) -> Error {
    Error::MissingColumn {
        source_name: path.display().to_string(),
        column: field.name().to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::ResultSource;
    use chrono::NaiveDate;
    use std::fs;

    #[test]
    fn test_parse_place() {
        assert_eq!(parse_place("12"), Some(12));
        assert_eq!(parse_place(" 3. "), Some(3));
        assert_eq!(parse_place("#7"), Some(7));
        assert_eq!(parse_place("0"), None);
        assert_eq!(parse_place("DNF"), None);
    }

    #[test]
    fn test_parse_age() {
        assert_eq!(parse_age("34"), Some(34));
        assert_eq!(parse_age("-"), None);
        assert_eq!(parse_age("999"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(1201.4), "20:01");
        assert_eq!(format_duration(59.6), "1:00");
        assert_eq!(format_duration(3723.0), "1:02:03");
        assert_eq!(format_duration(0.0), "0:00");
    }

    #[test]
    fn test_pace_per_mile() {
        assert_eq!(pace_per_mile(1860.0, 3.1), Some("10:00".to_string()));
        assert_eq!(pace_per_mile(1860.0, 0.0), None);
    }

    #[test]
    fn test_fallback_gender() {
        let ctx = ExtractContext::new(0).with_gender(Some(Gender::Female));
        assert_eq!(ctx.gender_or_fallback(None), Some(Gender::Female));
        assert_eq!(ctx.gender_or_fallback(Some(Gender::Male)), Some(Gender::Male));
    }

    #[test]
    fn test_get_extractor_formats() {
        let config = GrandPrixConfig::default();
        for format in [
            ResultFormat::FixedColumn,
            ResultFormat::TaggedCsv,
            ResultFormat::IndexedFeed,
            ResultFormat::RecordFeed,
        ] {
            assert_eq!(get_extractor(format, &config).format(), format);
        }
    }

    #[test]
    fn test_extract_race_merges_split_files() {
        let dir = tempfile::tempdir().unwrap();
        let male = dir.path().join("m.csv");
        let female = dir.path().join("f.csv");
        // No gender column in either file
        fs::write(&male, "RESULTS,Men\n1,Al Green,40,,Austin,MN,18:00,5:48\n2,Bo Diaz,33,,Byron,MN,19:00,6:07\n").unwrap();
        fs::write(&female, "RESULTS,Women\n1,Cy Ray,28,,Kasson,MN,20:00,6:27\n").unwrap();

        let race = Race {
            index: 1,
            name: "River Run".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            format: ResultFormat::TaggedCsv,
            sources: vec![
                ResultSource { path: male, gender: Some(Gender::Male) },
                ResultSource { path: female, gender: Some(Gender::Female) },
            ],
            distance_miles: None,
        };

        let results = extract_race(&race, &GrandPrixConfig::default()).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].gender, Some(Gender::Male));
        assert_eq!(results[1].gender, Some(Gender::Male));
        assert_eq!(results[2].gender, Some(Gender::Female));
        assert!(results.iter().all(|r| r.race_index == 1));
    }

    #[test]
    fn test_extract_race_missing_file_is_fatal() {
        let race = Race {
            index: 0,
            name: "Ghost".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            format: ResultFormat::FixedColumn,
            sources: vec![ResultSource { path: "/no/such/file.txt".into(), gender: None }],
            distance_miles: None,
        };
        let err = extract_race(&race, &GrandPrixConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_extract_race_skips_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.csv");
        // Second row has no time
        fs::write(&path, "RESULTS,All\n1,Al Green,40,M,Austin,MN,18:00,5:48\n2,Bo Diaz,33,M,Byron,MN,,\n3,Cy Ray,28,F,Kasson,MN,20:00,6:27\n").unwrap();

        let race = Race {
            index: 0,
            name: "Test".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            format: ResultFormat::TaggedCsv,
            sources: vec![ResultSource { path, gender: None }],
            distance_miles: None,
        };

        let results = extract_race(&race, &GrandPrixConfig::default()).unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Al Green", "Cy Ray"]);
    }
}
