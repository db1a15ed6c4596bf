// 🏆 Season Standings - best-N aggregation per division
//
// A member's season total counts only their best N race scores. Places use
// standard competition ranking on that total (50, 50, 40 -> 1, 1, 3);
// races run, then name, only break ties for display order.

use crate::division::Division;
use crate::roster::{Member, MemberDirectory};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingRow {
    pub name: String,
    /// Points per race, aligned to race index
    pub points: Vec<u32>,
    pub total: u32,
    pub races_run: usize,
    pub best_total: u32,
    pub place: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Standings {
    pub races: Vec<String>,
    pub best_of: usize,
    pub divisions: BTreeMap<Division, Vec<StandingRow>>,
}

/// Sum of the `n` highest scores
pub fn best_n_total(scores: &[u32], n: usize) -> u32 {
    let mut sorted = scores.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.iter().take(n).sum()
}

/// Competition places for totals already sorted descending
pub fn competition_places(totals: &[u32]) -> Vec<u32> {
    let mut places = Vec::with_capacity(totals.len());
    for (i, total) in totals.iter().enumerate() {
        let place = match i.checked_sub(1) {
            Some(prev) if totals[prev] == *total => places[prev],
            _ => i as u32 + 1,
        };
        places.push(place);
    }
    places
}

fn row_for(member: &Member, race_count: usize, best_of: usize) -> StandingRow {
    let mut points = vec![0u32; race_count];
    let mut scores = Vec::with_capacity(member.results.len());
    for result in &member.results {
        if let Some(slot) = points.get_mut(result.race_index) {
            *slot += result.points;
        }
        scores.push(result.points);
    }

    StandingRow {
        name: member.name.clone(),
        points,
        total: scores.iter().sum(),
        races_run: member.results.len(),
        best_total: best_n_total(&scores, best_of),
        place: 0,
    }
}

impl Standings {
    /// Build standings from every member with at least one scored result
    pub fn compute(directory: &MemberDirectory, races: Vec<String>, best_of: usize) -> Self {
        let mut divisions: BTreeMap<Division, Vec<StandingRow>> = BTreeMap::new();

        for member in directory.members() {
            if member.results.is_empty() {
                continue;
            }
            let Some(division) = member.standings_division() else {
                continue;
            };
            divisions
                .entry(division)
                .or_default()
                .push(row_for(member, races.len(), best_of));
        }

        for rows in divisions.values_mut() {
            rows.sort_by(|a, b| {
                b.best_total
                    .cmp(&a.best_total)
                    .then(b.races_run.cmp(&a.races_run))
                    .then_with(|| a.name.cmp(&b.name))
            });
            let totals: Vec<u32> = rows.iter().map(|r| r.best_total).collect();
            for (row, place) in rows.iter_mut().zip(competition_places(&totals)) {
                row.place = place;
            }
        }

        Standings {
            races,
            best_of,
            divisions,
        }
    }

    /// Rows for a division key such as "F3039"
    pub fn division(&self, key: &str) -> Option<&[StandingRow]> {
        self.divisions
            .iter()
            .find(|(division, _)| division.key() == key)
            .map(|(_, rows)| rows.as_slice())
    }
}
