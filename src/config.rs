// ⚙️ Grand Prix tunables
// Every threshold and constant the engines use, loadable from the season file.

use serde::{Deserialize, Serialize};

/// Which similarity function backs fuzzy name matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScorerKind {
    TokenSort,
    JaroWinkler,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrandPrixConfig {
    // ========================================================================
    // MATCHING
    // ========================================================================
    /// Minimum score (0-100) for a finisher to resolve to a member
    pub match_threshold: f64,

    /// Minimum score (0-100) for two roster records to be merged
    pub merge_threshold: f64,

    /// Scores this far below the threshold are reported as near misses
    pub near_miss_margin: f64,

    /// Allowed difference between reported age and birth-date age
    pub age_tolerance: u32,

    pub scorer: ScorerKind,

    /// Characters of the given name kept in the matching key
    pub given_name_prefix: usize,

    // ========================================================================
    // SCORING
    // ========================================================================
    /// Points for i-th scoring finisher are `points_base - i` (never negative)
    pub points_base: u32,

    /// Number of best results counted toward the season total
    pub best_of: usize,

    /// When true a non-member also uses up a points slot in its division
    pub non_member_takes_slot: bool,

    // ========================================================================
    // MEMBERSHIP
    // ========================================================================
    /// Signups submitted in or after this month count toward next year
    pub renewal_cutoff_month: u32,

    // ========================================================================
    // FIXED-COLUMN LAYOUT
    // ========================================================================
    /// Words whose tops differ by more than this start a new row
    pub row_tolerance: f64,

    /// Data rows with fewer words are treated as noise
    pub min_row_tokens: usize,

    /// Slack on both edges of a column window
    pub column_epsilon: f64,
}

impl Default for GrandPrixConfig {
    fn default() -> Self {
        GrandPrixConfig {
            match_threshold: 85.0,
            merge_threshold: 90.0,
            near_miss_margin: 10.0,
            age_tolerance: 1,
            scorer: ScorerKind::TokenSort,
            given_name_prefix: 3,
            points_base: 11,
            best_of: 5,
            non_member_takes_slot: false,
            renewal_cutoff_month: 9,
            row_tolerance: 5.0,
            min_row_tokens: 7,
            column_epsilon: 0.01,
        }
    }
}

impl GrandPrixConfig {
    /// Reject values that would make the engines misbehave
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        for (name, value) in [
            ("match_threshold", self.match_threshold),
            ("merge_threshold", self.merge_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(Error::Config(format!("{} must be within 0-100, got {}", name, value)));
            }
        }
        if self.best_of == 0 {
            return Err(Error::Config("best_of must be at least 1".to_string()));
        }
        if !(1..=12).contains(&self.renewal_cutoff_month) {
            return Err(Error::Config(format!(
                "renewal_cutoff_month must be 1-12, got {}",
                self.renewal_cutoff_month
            )));
        }
        if self.given_name_prefix == 0 {
            return Err(Error::Config("given_name_prefix must be at least 1".to_string()));
        }
        Ok(())
    }
}
