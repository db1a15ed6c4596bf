// 📅 Season configuration - races, roster sources, tunables
// Loaded once from a JSON season file; races are immutable afterwards.

use crate::config::GrandPrixConfig;
use crate::result::Gender;
use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// RACE
// ============================================================================

/// Result file format declared for a race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultFormat {
    /// Fixed-column text (PDF text layer or layout-preserving export)
    #[serde(rename = "pdf")]
    FixedColumn,

    /// Row-tagged CSV export
    #[serde(rename = "csv")]
    TaggedCsv,

    /// JSON feed with a field-name-to-index map
    #[serde(rename = "json-variant-a")]
    IndexedFeed,

    /// JSON feed of result objects with nested locations
    #[serde(rename = "json-variant-b")]
    RecordFeed,
}

impl ResultFormat {
    pub fn name(&self) -> &str {
        match self {
            ResultFormat::FixedColumn => "fixed-column text",
            ResultFormat::TaggedCsv => "row-tagged CSV",
            ResultFormat::IndexedFeed => "indexed JSON feed",
            ResultFormat::RecordFeed => "record JSON feed",
        }
    }
}

/// One result file; `gender` is set for single-gender files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSource {
    pub path: PathBuf,
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Race {
    /// Position in the season, aligns per-race point columns
    pub index: usize,
    pub name: String,
    pub date: NaiveDate,
    pub format: ResultFormat,
    pub sources: Vec<ResultSource>,
    pub distance_miles: Option<f64>,
}

// ============================================================================
// SEASON FILE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct RaceEntry {
    name: String,
    date: NaiveDate,
    results_type: ResultFormat,
    #[serde(default)]
    file: Option<PathBuf>,
    #[serde(default)]
    male_file: Option<PathBuf>,
    #[serde(default)]
    female_file: Option<PathBuf>,
    #[serde(default)]
    distance_miles: Option<f64>,
}

/// Roster source kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterKind {
    /// Hand-maintained base list with expiration dates
    Legacy,
    /// Individual signup-form export
    Signup,
    /// Family signup-form export with dependents
    Family,
    /// Recorded pages from the remote membership API
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSourceConfig {
    pub kind: RosterKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct SeasonFile {
    year: i32,
    #[serde(default)]
    as_of: Option<NaiveDate>,
    #[serde(default)]
    races: Vec<RaceEntry>,
    #[serde(default)]
    roster: Vec<RosterSourceConfig>,
    #[serde(default)]
    nicknames: Option<PathBuf>,
    #[serde(default)]
    scoring: GrandPrixConfig,
}

/// Season - the validated season file
#[derive(Debug, Clone)]
pub struct Season {
    pub year: i32,
    /// Reference date for "current" membership and member ages
    pub as_of: NaiveDate,
    pub races: Vec<Race>,
    pub roster: Vec<RosterSourceConfig>,
    pub nicknames: Option<PathBuf>,
    pub config: GrandPrixConfig,
}

impl Season {
    /// Load a season file; relative paths resolve against its directory
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read season file: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        Season::from_json(&content, base)
            .with_context(|| format!("Invalid season file: {}", path.display()))
    }

    pub fn from_json(content: &str, base: &Path) -> Result<Self> {
        let file: SeasonFile =
            serde_json::from_str(content).context("Failed to parse season JSON")?;
        file.config_check()?;

        let mut races = Vec::with_capacity(file.races.len());
        for (index, entry) in file.races.into_iter().enumerate() {
            races.push(build_race(index, entry, base)?);
        }

        let as_of = match file.as_of {
            Some(date) => date,
            None => races
                .iter()
                .map(|r| r.date)
                .max()
                .or_else(|| NaiveDate::from_ymd_opt(file.year, 12, 31))
                .context("Season year out of range")?,
        };

        Ok(Season {
            year: file.year,
            as_of,
            races,
            roster: file
                .roster
                .into_iter()
                .map(|r| RosterSourceConfig {
                    kind: r.kind,
                    path: resolve(base, &r.path),
                })
                .collect(),
            nicknames: file.nicknames.map(|p| resolve(base, &p)),
            config: file.scoring,
        })
    }

    /// Date of the latest race, if any races are configured
    pub fn latest_race(&self) -> Option<NaiveDate> {
        self.races.iter().map(|r| r.date).max()
    }
}

impl SeasonFile {
    fn config_check(&self) -> Result<()> {
        self.scoring.validate()?;
        for entry in &self.races {
            if entry.date.year() != self.year {
                tracing::warn!(race = %entry.name, date = %entry.date, year = self.year, "Race date outside season year");
            }
        }
        Ok(())
    }
}

fn build_race(index: usize, entry: RaceEntry, base: &Path) -> Result<Race> {
    let sources = match (entry.file, entry.male_file, entry.female_file) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            bail!("Race '{}' mixes 'file' with per-gender files", entry.name)
        }
        (Some(file), None, None) => vec![ResultSource {
            path: resolve(base, &file),
            gender: None,
        }],
        (None, Some(male), Some(female)) => vec![
            ResultSource {
                path: resolve(base, &male),
                gender: Some(Gender::Male),
            },
            ResultSource {
                path: resolve(base, &female),
                gender: Some(Gender::Female),
            },
        ],
        (None, Some(_), None) | (None, None, Some(_)) => {
            bail!("Race '{}' needs both 'male_file' and 'female_file'", entry.name)
        }
        (None, None, None) => Vec::new(),
    };

    if let Some(distance) = entry.distance_miles {
        if distance <= 0.0 {
            bail!("Race '{}' has a non-positive distance", entry.name);
        }
    }

    Ok(Race {
        index,
        name: entry.name,
        date: entry.date,
        format: entry.results_type,
        sources,
        distance_miles: entry.distance_miles,
    })
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// ============================================================================
// TESTS
// ============================================================================
