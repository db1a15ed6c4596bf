// 🏅 Scoring Engine - per-race division points
//
// Within each division, finishers sort by race place. The i-th scoring
// member earns `points_base - i` (floored at zero). Non-members keep their
// place in the ordering but earn nothing and, by default, use no slot.

use crate::config::GrandPrixConfig;
use crate::division::Division;
use crate::result::RaceResult;
use crate::roster::MemberDirectory;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RaceScore {
    pub divisions: usize,
    pub members_scored: usize,
    /// Results with no resolvable division; kept but never scored
    pub unplaced: usize,
}

/// Points for the `slot`-th scoring member (1-indexed)
pub fn points_for_slot(points_base: u32, slot: u32) -> u32 {
    points_base.saturating_sub(slot)
}

/// Score one race in place and append each member's result to the member
pub fn score_race(
    results: &mut [RaceResult],
    directory: &mut MemberDirectory,
    config: &GrandPrixConfig,
) -> RaceScore {
    let mut divisions: BTreeMap<Division, Vec<usize>> = BTreeMap::new();
    let mut score = RaceScore::default();

    for (i, result) in results.iter_mut().enumerate() {
        result.set_division();
        result.points = 0;
        match result.division {
            Some(division) => divisions.entry(division).or_default().push(i),
            None => score.unplaced += 1,
        }
    }

    for (division, mut group) in divisions {
        // Stable: equal places keep source order
        group.sort_by_key(|&i| results[i].place);

        let mut slot = 0u32;
        for i in group {
            let result = &mut results[i];
            if result.is_member {
                slot += 1;
                result.points = points_for_slot(config.points_base, slot);

                let key = result.member_key.clone().unwrap_or_default();
                match directory.get_mut(&key) {
                    Some(member) => {
                        member.add_result(result.clone());
                        score.members_scored += 1;
                    }
                    None => warn!(finisher = %result.name, division = %division, "Scored member missing from directory"),
                }
            } else if config.non_member_takes_slot {
                slot += 1;
            }
        }
        score.divisions += 1;
    }

    info!(
        divisions = score.divisions,
        members_scored = score.members_scored,
        unplaced = score.unplaced,
        "Scored race"
    );
    score
}
