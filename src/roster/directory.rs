// 📒 Member Directory - deduplicated roster keyed by normalized name
//
// Rosters are folded in one at a time with a fuzzy merge; race finishers
// are then resolved against the merged directory. A flat BTreeMap keeps
// the highest-score scan deterministic: on equal scores the smaller key wins.

use super::matching::{scorer_for, SimilarityScorer};
use super::member::Member;
use super::normalize::NameNormalizer;
use crate::config::GrandPrixConfig;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

// ============================================================================
// OUTCOMES
// ============================================================================

/// Summary of one roster merge
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    pub inserted: usize,
    pub merged: usize,
    /// Active members from this roster that matched nobody already present
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub key: String,
    pub score: f64,
}

/// Result of looking a finisher up in the directory
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Matched(Candidate),
    /// Best candidate fell short of the threshold, but not by much
    NearMiss(Candidate),
    NoMatch,
}

impl Lookup {
    pub fn matched_key(&self) -> Option<&str> {
        match self {
            Lookup::Matched(c) => Some(&c.key),
            _ => None,
        }
    }
}

// ============================================================================
// DIRECTORY
// ============================================================================

pub struct MemberDirectory {
    members: BTreeMap<String, Member>,
    normalizer: NameNormalizer,
    scorer: Box<dyn SimilarityScorer>,

    /// Score (0-100) at which two roster records are the same person
    pub merge_threshold: f64,

    /// Allowed gap between a reported age and the birth-date age
    pub age_tolerance: u32,

    /// Reference date for divisions and lapsed memberships
    pub as_of: NaiveDate,
}

impl MemberDirectory {
    pub fn new(normalizer: NameNormalizer, scorer: Box<dyn SimilarityScorer>, as_of: NaiveDate) -> Self {
        MemberDirectory {
            members: BTreeMap::new(),
            normalizer,
            scorer,
            merge_threshold: 90.0,
            age_tolerance: 1,
            as_of,
        }
    }

    pub fn from_config(config: &GrandPrixConfig, normalizer: NameNormalizer, as_of: NaiveDate) -> Self {
        let mut directory = MemberDirectory::new(normalizer, scorer_for(config.scorer), as_of);
        directory.merge_threshold = config.merge_threshold;
        directory.age_tolerance = config.age_tolerance;
        directory
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Member> {
        self.members.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Member> {
        self.members.get_mut(key)
    }

    /// Members in key order
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn normalize(&self, name: &str) -> String {
        self.normalizer.normalize(name)
    }

    /// Highest-scoring key among members passing `eligible`
    fn best<F>(&self, key: &str, eligible: F) -> Option<Candidate>
    where
        F: Fn(&Member) -> bool,
    {
        let mut best: Option<Candidate> = None;
        for (existing, member) in &self.members {
            if !eligible(member) {
                continue;
            }
            let score = if existing == key { 100.0 } else { self.scorer.score(key, existing) };
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Candidate {
                    key: existing.clone(),
                    score,
                });
            }
        }
        best
    }

    // ========================================================================
    // MERGE
    // ========================================================================

    /// Fold a freshly loaded roster into the directory.
    ///
    /// Unmatched diagnostics are only raised against a non-empty directory
    /// and only for members whose term has not lapsed.
    pub fn merge(&mut self, incoming: Vec<Member>) -> MergeReport {
        let mut report = MergeReport::default();
        let had_members = !self.members.is_empty();
        let year = self.as_of.year();

        for mut member in incoming {
            let key = self.normalizer.normalize(&member.name);
            member.key = key.clone();

            let target = self
                .best(&key, |_| true)
                .filter(|c| c.score >= self.merge_threshold);

            match target.and_then(|c| self.members.get_mut(&c.key).map(|m| (c.score, m))) {
                Some((score, existing)) => {
                    debug!(incoming = %member.name, existing = %existing.name, score, "Merging roster record");
                    existing.absorb(member);
                    existing.refresh_division(self.as_of);
                    report.merged += 1;
                }
                None => {
                    if had_members && !member.has_lapsed(year) {
                        report.unmatched.push(member.name.clone());
                    }
                    member.refresh_division(self.as_of);
                    self.members.insert(key, member);
                    report.inserted += 1;
                }
            }
        }

        info!(
            inserted = report.inserted,
            merged = report.merged,
            unmatched = report.unmatched.len(),
            total = self.members.len(),
            "Merged roster"
        );
        report
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Look a finisher up. Candidates whose birth-date age on `date` is more
    /// than `age_tolerance` away from `age` are never considered.
    pub fn lookup(&self, name: &str, age: Option<u32>, date: Option<NaiveDate>, threshold: f64, near_miss_margin: f64) -> Lookup {
        let key = self.normalizer.normalize(name);
        let on = date.unwrap_or(self.as_of);

        let age_fits = |member: &Member| match (age, member.age_on(on)) {
            (Some(reported), Some(actual)) => reported.abs_diff(actual) <= self.age_tolerance,
            _ => true,
        };

        match self.best(&key, age_fits) {
            Some(c) if c.score >= threshold => Lookup::Matched(c),
            Some(c) if c.score >= threshold - near_miss_margin => Lookup::NearMiss(c),
            _ => Lookup::NoMatch,
        }
    }

    /// Best member at or above `threshold`, if any
    pub fn resolve(&self, name: &str, age: Option<u32>, date: Option<NaiveDate>, threshold: f64) -> Option<&Member> {
        match self.lookup(name, age, date, threshold, 0.0) {
            Lookup::Matched(c) => self.members.get(&c.key),
            _ => None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Gender;
    use crate::roster::matching::TokenSortRatio;
    use crate::roster::member::MembershipTerm;
    use crate::season::RosterKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn directory() -> MemberDirectory {
        MemberDirectory::new(NameNormalizer::new(3), Box::new(TokenSortRatio), date(2025, 12, 31))
    }

    fn member(name: &str, born: Option<NaiveDate>, term: (i32, i32)) -> Member {
        Member::new(name, MembershipTerm::new(term.0, term.1), RosterKind::Signup)
            .with_birth_date(born)
            .with_gender(Some(Gender::Female))
    }

    #[test]
    fn test_first_roster_never_unmatched() {
        let mut dir = directory();
        let report = dir.merge(vec![member("Jane Doe", None, (2025, 2025))]);
        assert_eq!(report.inserted, 1);
        assert!(report.unmatched.is_empty());
        assert_eq!(dir.get("jan doe").map(|m| m.name.as_str()), Some("Jane Doe"));
    }

    #[test]
    fn test_merge_backfills_and_refreshes_division() {
        let mut dir = directory();
        dir.merge(vec![member("Jane Doe", None, (2025, 2025))]);
        assert_eq!(dir.get("jan doe").and_then(|m| m.division), None);

        let report = dir.merge(vec![member("Janet Doe", Some(date(1990, 6, 15)), (2025, 2026))]);
        assert_eq!(report.merged, 1);
        assert_eq!(dir.len(), 1);

        let jane = dir.get("jan doe").unwrap();
        assert_eq!(jane.birth_date, Some(date(1990, 6, 15)));
        assert_eq!(jane.division.map(|d| d.key()), Some("F3039".to_string()));
        assert_eq!(jane.term, MembershipTerm::new(2025, 2026));
    }

    #[test]
    fn test_unmatched_only_for_active_members() {
        let mut dir = directory();
        dir.merge(vec![member("Jane Doe", None, (2025, 2025))]);

        let report = dir.merge(vec![
            member("Al Green", None, (2025, 2025)),
            member("Old Timer", None, (2020, 2021)),
        ]);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.unmatched, vec!["Al Green".to_string()]);
    }

    #[test]
    fn test_merge_idempotent() {
        let roster = vec![
            member("Jane Doe", Some(date(1990, 6, 15)), (2025, 2025)),
            member("Al Green", None, (2025, 2025)),
        ];
        let mut dir = directory();
        dir.merge(roster.clone());
        let before: Vec<Member> = dir.members().cloned().collect();

        let empty = dir.merge(Vec::new());
        assert_eq!(empty, MergeReport::default());

        let again = dir.merge(roster);
        assert_eq!(again.inserted, 0);
        assert!(again.unmatched.is_empty());
        let after: Vec<Member> = dir.members().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_resolve_fuzzy_name() {
        let mut dir = directory();
        dir.merge(vec![member("Jane Doe", Some(date(1991, 1, 1)), (2025, 2025))]);

        let found = dir.resolve("Jane Doey", Some(34), Some(date(2025, 6, 1)), 85.0);
        assert_eq!(found.map(|m| m.name.as_str()), Some("Jane Doe"));
        assert!(dir.resolve("Bob Smith", None, None, 85.0).is_none());
    }

    #[test]
    fn test_resolve_excludes_wrong_age() {
        let mut dir = directory();
        dir.merge(vec![member("Jane Doe", Some(date(1960, 1, 1)), (2025, 2025))]);

        // 65 on race day, reported 34
        assert!(dir.resolve("Jane Doe", Some(34), Some(date(2025, 6, 1)), 85.0).is_none());
        // Within one year either way
        assert!(dir.resolve("Jane Doe", Some(64), Some(date(2025, 6, 1)), 85.0).is_some());
        // No reported age: name alone decides
        assert!(dir.resolve("Jane Doe", None, Some(date(2025, 6, 1)), 85.0).is_some());
    }

    #[test]
    fn test_age_exclusion_falls_to_next_candidate() {
        let mut dir = directory();
        dir.merge(vec![
            member("Jane Doe", Some(date(1960, 1, 1)), (2025, 2025)),
            member("Jane Doer", Some(date(1991, 1, 1)), (2025, 2025)),
        ]);
        assert_eq!(dir.len(), 2);

        let race_day = Some(date(2025, 6, 1));
        // The exact name is 65; the weaker name fits the reported age
        let found = dir.resolve("Jane Doe", Some(34), race_day, 85.0);
        assert_eq!(found.map(|m| m.name.as_str()), Some("Jane Doer"));

        let found = dir.resolve("Jane Doe", None, race_day, 85.0);
        assert_eq!(found.map(|m| m.name.as_str()), Some("Jane Doe"));
    }

    #[test]
    fn test_resolve_picks_highest_score() {
        let mut dir = directory();
        dir.merge(vec![
            member("Jane Doe", None, (2025, 2025)),
            member("Jane Doerr", None, (2025, 2025)),
        ]);
        let found = dir.resolve("Jane Doerr", None, None, 80.0);
        assert_eq!(found.map(|m| m.name.as_str()), Some("Jane Doerr"));
    }

    #[test]
    fn test_lookup_near_miss() {
        let mut dir = directory();
        dir.merge(vec![member("Jane Doe", None, (2025, 2025))]);

        // "doey jan" vs "doe jan" scores 87.5
        match dir.lookup("Jane Doey", None, None, 90.0, 10.0) {
            Lookup::NearMiss(c) => assert_eq!(c.key, "jan doe"),
            other => panic!("expected near miss, got {:?}", other),
        }
        assert_eq!(dir.lookup("Jane Doey", None, None, 99.0, 5.0), Lookup::NoMatch);
        assert_eq!(dir.lookup("Jane Doey", None, None, 85.0, 10.0).matched_key(), Some("jan doe"));
    }
}
