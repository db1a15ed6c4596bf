// 🎯 Fuzzy name scoring
// Pluggable similarity: 0-100, token-order insensitive, tuned separately
// from the directory's merge/resolve control flow.

use crate::config::ScorerKind;

/// SimilarityScorer - score two normalized names 0-100
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;

    fn name(&self) -> &str;
}

/// Sort the whitespace tokens so word order does not matter
fn token_sorted(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Token-sorted normalized Levenshtein
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl SimilarityScorer for TokenSortRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(&token_sorted(a), &token_sorted(b)) * 100.0
    }

    fn name(&self) -> &str {
        "token-sort"
    }
}

/// Token-sorted Jaro-Winkler; kinder to shared prefixes
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl SimilarityScorer for JaroWinkler {
    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(&token_sorted(a), &token_sorted(b)) * 100.0
    }

    fn name(&self) -> &str {
        "jaro-winkler"
    }
}

pub fn scorer_for(kind: ScorerKind) -> Box<dyn SimilarityScorer> {
    match kind {
        ScorerKind::TokenSort => Box::new(TokenSortRatio),
        ScorerKind::JaroWinkler => Box::new(JaroWinkler),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_order_ignored() {
        let scorer = TokenSortRatio;
        assert_eq!(scorer.score("jan doe", "doe jan"), 100.0);
        assert_eq!(JaroWinkler.score("jan doe", "doe jan"), 100.0);
    }

    #[test]
    fn test_close_spelling_scores_high() {
        let score = TokenSortRatio.score("jan doey", "jan doe");
        assert!((score - 87.5).abs() < 1e-9);
    }

    #[test]
    fn test_unrelated_names_score_low() {
        assert!(TokenSortRatio.score("al green", "mar olson") < 50.0);
        assert!(JaroWinkler.score("al green", "mar olson") < 70.0);
    }

    #[test]
    fn test_scorer_for_kind() {
        assert_eq!(scorer_for(ScorerKind::TokenSort).name(), "token-sort");
        assert_eq!(scorer_for(ScorerKind::JaroWinkler).name(), "jaro-winkler");
    }
}
