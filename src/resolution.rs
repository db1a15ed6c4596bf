// 🔗 Membership Resolution - finishers to members
// Each extracted result is looked up in the directory once. A match
// backfills missing age/gender and flags the result as a member result.

use crate::config::GrandPrixConfig;
use crate::result::RaceResult;
use crate::roster::{Lookup, MemberDirectory};
use crate::season::Race;
use chrono::Datelike;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Soft reconciliation warning; never aborts a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Active member from a later roster that matched nobody already loaded
    UnmatchedMember { name: String, roster: String },

    /// Finisher whose best candidate scored just below the threshold
    NearMiss {
        race: String,
        finisher: String,
        candidate: String,
        score: f64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnmatchedMember { name, roster } => {
                write!(f, "unmatched member '{}' in {}", name, roster)
            }
            Diagnostic::NearMiss {
                race,
                finisher,
                candidate,
                score,
            } => write!(
                f,
                "near miss in {}: '{}' vs member '{}' ({:.1})",
                race, finisher, candidate, score
            ),
        }
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolve every result of one race against the directory.
///
/// Sets `member_key` for matches, `is_member` when the matched membership
/// covers the race year, and recomputes each result's division.
pub fn resolve_results(
    results: &mut [RaceResult],
    directory: &MemberDirectory,
    race: &Race,
    config: &GrandPrixConfig,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut matched = 0usize;

    for result in results.iter_mut() {
        let lookup = directory.lookup(
            &result.name,
            result.age,
            Some(race.date),
            config.match_threshold,
            config.near_miss_margin,
        );

        match lookup {
            Lookup::Matched(candidate) => {
                if let Some(member) = directory.get(&candidate.key) {
                    debug!(finisher = %result.name, member = %member.name, score = candidate.score, "Resolved finisher");
                    if result.age.is_none() {
                        result.age = member.age_on(race.date);
                    }
                    if result.gender.is_none() {
                        result.gender = member.gender;
                    }
                    result.is_member = member.is_active(race.date.year());
                    result.member_key = Some(candidate.key);
                    matched += 1;
                }
            }
            Lookup::NearMiss(candidate) => {
                let candidate_name = directory
                    .get(&candidate.key)
                    .map(|m| m.name.clone())
                    .unwrap_or(candidate.key);
                diagnostics.push(Diagnostic::NearMiss {
                    race: race.name.clone(),
                    finisher: result.name.clone(),
                    candidate: candidate_name,
                    score: candidate.score,
                });
            }
            Lookup::NoMatch => {}
        }

        result.set_division();
    }

    info!(race = %race.name, finishers = results.len(), matched, near_misses = diagnostics.len(), "Resolved race");
    diagnostics
}
