// 🛰️ Structured result feeds
//
// Two JSON shapes from online timing services:
//
//   indexed: {"fields": {"Place": 0, "Name": 1, ...}, "rows": [[...], ...]}
//            field names map to positions, so column order is free
//   records: [{"displayName": ..., "age": ..., "location": {...}}, ...]
//            or the same array under a top-level "results" key
//
// Feeds only guarantee a name and a time. Age and gender may be null and
// get backfilled from the roster later.

use super::columns::Field;
use super::{
    format_duration, missing_column, non_empty, pace_per_mile, parse_age, parse_place, ExtractContext,
    ResultExtractor, ResultStream,
};
use crate::error::{read_source, Error, Result};
use crate::result::{Gender, RaceResult};
use crate::season::ResultFormat;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// CELL HELPERS
// ============================================================================

/// Strings and numbers are both accepted as text
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(Some(s.as_str())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_u32(value: &Value, parse: fn(&str) -> Option<u32>) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).and_then(|v| parse(&v.to_string())),
        Value::String(s) => parse(s),
        _ => None,
    }
}

/// A time cell holds a display string or a duration in seconds
fn value_time(value: &Value) -> Option<(String, Option<f64>)> {
    match value {
        Value::Number(n) => n.as_f64().map(|secs| (format_duration(secs), Some(secs))),
        Value::String(s) => non_empty(Some(s.as_str())).map(|t| (t, None)),
        _ => None,
    }
}

fn derived_pace(seconds: Option<f64>, ctx: &ExtractContext) -> Option<String> {
    pace_per_mile(seconds?, ctx.distance_miles?)
}

// ============================================================================
// INDEXED FEED
// ============================================================================

#[derive(Debug, Deserialize)]
struct IndexedDocument {
    fields: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct IndexedFeedExtractor;

impl IndexedFeedExtractor {
    pub fn new() -> Self {
        IndexedFeedExtractor
    }
}

/// Field positions resolved from the document's name map
#[derive(Debug, Clone, Default)]
struct FieldIndex {
    positions: HashMap<Field, usize>,
}

impl FieldIndex {
    fn from_names(names: &HashMap<String, usize>) -> Self {
        let positions = names
            .iter()
            .filter_map(|(name, pos)| Field::from_label(name).map(|field| (field, *pos)))
            .collect();
        FieldIndex { positions }
    }

    fn get<'r>(&self, row: &'r [Value], field: Field) -> Option<&'r Value> {
        self.positions.get(&field).and_then(|pos| row.get(*pos))
    }
}

impl ResultExtractor for IndexedFeedExtractor {
    fn extract(&self, path: &Path, ctx: &ExtractContext) -> Result<ResultStream> {
        let content = read_source(path)?;
        let doc: IndexedDocument =
            serde_json::from_str(&content).map_err(|e| Error::malformed(path, e.to_string()))?;

        let index = FieldIndex::from_names(&doc.fields);
        for required in [Field::Name, Field::Time] {
            if !index.positions.contains_key(&required) {
                return Err(missing_column(path, required));
            }
        }

        let source = path.display().to_string();
        let ctx = ctx.clone();
        let rows = doc.rows.into_iter().enumerate().map(move |(i, row)| -> Result<RaceResult> {
            let name = index
                .get(&row, Field::Name)
                .and_then(value_text)
                .ok_or_else(|| Error::format(source.clone(), format!("row {} has no name", i + 1)))?;
            let (time, seconds) = index
                .get(&row, Field::Time)
                .and_then(value_time)
                .ok_or_else(|| Error::format(source.clone(), format!("row {} has no time", i + 1)))?;

            let place = index
                .get(&row, Field::Place)
                .and_then(|v| value_u32(v, parse_place))
                .unwrap_or(i as u32 + 1);
            let pace = index
                .get(&row, Field::Pace)
                .and_then(value_text)
                .or_else(|| derived_pace(seconds, &ctx));
            let gender = index
                .get(&row, Field::Gender)
                .and_then(value_text)
                .and_then(|g| Gender::parse(&g));

            Ok(RaceResult::new(place, name, time, ctx.race_index)
                .with_pace(pace)
                .with_age(index.get(&row, Field::Age).and_then(|v| value_u32(v, parse_age)))
                .with_gender(ctx.gender_or_fallback(gender))
                .with_location(
                    index.get(&row, Field::City).and_then(value_text),
                    index.get(&row, Field::State).and_then(value_text),
                ))
        });

        Ok(Box::new(rows))
    }

    fn format(&self) -> ResultFormat {
        ResultFormat::IndexedFeed
    }
}

// ============================================================================
// RECORD FEED
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordDocument {
    List(Vec<Value>),
    Wrapped { results: Vec<Value> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedRecord {
    display_name: Option<String>,
    name: Option<String>,
    #[serde(default)]
    age: Value,
    gender: Option<String>,
    #[serde(default)]
    overall_rank: Value,
    location: Option<FeedLocation>,
    duration_seconds: Option<f64>,
    time: Option<String>,
    pace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedLocation {
    city: Option<String>,
    state: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordFeedExtractor;

impl RecordFeedExtractor {
    pub fn new() -> Self {
        RecordFeedExtractor
    }
}

fn build_record(record: FeedRecord, position: u32, ctx: &ExtractContext, source: &str) -> Result<RaceResult> {
    let name = non_empty(record.display_name.as_deref())
        .or_else(|| non_empty(record.name.as_deref()))
        .ok_or_else(|| Error::format(source, format!("record {} has no name", position)))?;

    let (time, seconds) = match (record.duration_seconds, non_empty(record.time.as_deref())) {
        (Some(secs), _) => (format_duration(secs), Some(secs)),
        (None, Some(text)) => (text, None),
        (None, None) => {
            return Err(Error::format(source, format!("record {} ({}) has no time", position, name)));
        }
    };

    let (city, state) = match record.location {
        Some(loc) => (
            non_empty(loc.city.as_deref()),
            non_empty(loc.state.as_deref()).or_else(|| non_empty(loc.region.as_deref())),
        ),
        None => (None, None),
    };

    let pace = non_empty(record.pace.as_deref()).or_else(|| derived_pace(seconds, ctx));
    let gender = record.gender.as_deref().and_then(Gender::parse);

    Ok(RaceResult::new(
        value_u32(&record.overall_rank, parse_place).unwrap_or(position),
        name,
        time,
        ctx.race_index,
    )
    .with_pace(pace)
    .with_age(value_u32(&record.age, parse_age))
    .with_gender(ctx.gender_or_fallback(gender))
    .with_location(city, state))
}

impl ResultExtractor for RecordFeedExtractor {
    fn extract(&self, path: &Path, ctx: &ExtractContext) -> Result<ResultStream> {
        let content = read_source(path)?;
        let doc: RecordDocument =
            serde_json::from_str(&content).map_err(|e| Error::malformed(path, e.to_string()))?;
        let records = match doc {
            RecordDocument::List(records) | RecordDocument::Wrapped { results: records } => records,
        };

        let source = path.display().to_string();
        let ctx = ctx.clone();
        let rows = records.into_iter().enumerate().map(move |(i, value)| -> Result<RaceResult> {
            let position = i as u32 + 1;
            let record: FeedRecord = serde_json::from_value(value)
                .map_err(|e| Error::format(source.clone(), format!("record {}: {}", position, e)))?;
            build_record(record, position, &ctx, &source)
        });

        Ok(Box::new(rows))
    }

    fn format(&self) -> ResultFormat {
        ResultFormat::RecordFeed
    }
}

// ============================================================================
// TESTS
// ============================================================================
