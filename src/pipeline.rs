// 🏁 Grand Prix pipeline - one season, start to finish
//
//   rosters -> directory -> for each race: extract -> resolve -> score
//           -> standings
//
// Roster or race-file failures abort the run; bad rows and fragments are
// logged and skipped along the way.

use crate::extract::extract_race;
use crate::resolution::{resolve_results, Diagnostic};
use crate::roster::{load_roster, MemberDirectory, MembershipRules, NameNormalizer};
use crate::scoring::score_race;
use crate::season::Season;
use crate::standings::Standings;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Per-race line of the season report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceSummary {
    pub index: usize,
    pub name: String,
    pub date: NaiveDate,
    pub finishers: usize,
    pub members_scored: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonReport {
    pub year: i32,
    pub as_of: NaiveDate,
    pub races: Vec<RaceSummary>,
    pub standings: Standings,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct GrandPrix {
    pub season: Season,
    normalizer: NameNormalizer,
}

impl GrandPrix {
    /// Load the season's nickname table (if any) once, up front
    pub fn new(season: Season) -> Result<Self> {
        let prefix = season.config.given_name_prefix;
        let normalizer = match &season.nicknames {
            Some(path) => NameNormalizer::from_nickname_file(prefix, path)
                .with_context(|| format!("Failed to load nicknames: {}", path.display()))?,
            None => NameNormalizer::new(prefix),
        };
        Ok(GrandPrix { season, normalizer })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        GrandPrix::new(Season::from_file(path)?)
    }

    /// Load and merge every configured roster, in order
    pub fn build_directory(&self) -> Result<(MemberDirectory, Vec<Diagnostic>)> {
        let config = &self.season.config;
        let rules = MembershipRules::new(config.renewal_cutoff_month);
        let mut directory = MemberDirectory::from_config(config, self.normalizer.clone(), self.season.as_of);
        let mut diagnostics = Vec::new();

        for source in &self.season.roster {
            let members = load_roster(source, &rules)
                .with_context(|| format!("Failed to load roster: {}", source.path.display()))?;
            let report = directory.merge(members);

            let roster = source.path.display().to_string();
            diagnostics.extend(report.unmatched.into_iter().map(|name| Diagnostic::UnmatchedMember {
                name,
                roster: roster.clone(),
            }));
        }

        Ok((directory, diagnostics))
    }

    /// Score every race against an already-built directory
    pub fn score_season(&self, mut directory: MemberDirectory, mut diagnostics: Vec<Diagnostic>) -> Result<SeasonReport> {
        let config = &self.season.config;
        let mut races = Vec::with_capacity(self.season.races.len());

        for race in &self.season.races {
            let mut results =
                extract_race(race, config).with_context(|| format!("Failed to extract race: {}", race.name))?;

            diagnostics.extend(resolve_results(&mut results, &directory, race, config));
            let score = score_race(&mut results, &mut directory, config);

            races.push(RaceSummary {
                index: race.index,
                name: race.name.clone(),
                date: race.date,
                finishers: results.len(),
                members_scored: score.members_scored,
            });
        }

        let race_names = self.season.races.iter().map(|r| r.name.clone()).collect();
        let standings = Standings::compute(&directory, race_names, config.best_of);

        info!(
            year = self.season.year,
            races = races.len(),
            divisions = standings.divisions.len(),
            diagnostics = diagnostics.len(),
            "Season complete"
        );

        Ok(SeasonReport {
            year: self.season.year,
            as_of: self.season.as_of,
            races,
            standings,
            diagnostics,
        })
    }

    pub fn run(&self) -> Result<SeasonReport> {
        let (directory, diagnostics) = self.build_directory()?;
        self.score_season(directory, diagnostics)
    }
}

// ============================================================================
// TESTS
// ============================================================================
