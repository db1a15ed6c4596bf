// Grand Prix Standings - Core Library
// Exposes all modules for use in the CLI and tests

pub mod config;
pub mod division;
pub mod error;
pub mod extract;    // Result extraction - four source formats
pub mod pipeline;
pub mod report;
pub mod resolution; // Finisher -> member resolution
pub mod result;
pub mod roster;     // Roster loading, normalization, fuzzy merge
pub mod scoring;
pub mod season;
pub mod standings;

// Re-export commonly used types
pub use config::{GrandPrixConfig, ScorerKind};
pub use division::Division;
pub use error::{Error, Result};
pub use extract::{
    extract_race, get_extractor, ExtractContext, ResultExtractor, ResultStream,
    FixedColumnExtractor, TaggedCsvExtractor, IndexedFeedExtractor, RecordFeedExtractor,
};
pub use pipeline::{GrandPrix, RaceSummary, SeasonReport};
pub use resolution::{resolve_results, Diagnostic};
pub use result::{Gender, RaceResult};
pub use roster::{
    load_roster, Member, MemberDirectory, MembershipRules, MembershipTerm,
    NameNormalizer, SimilarityScorer, TokenSortRatio, JaroWinkler,
    RosterPageSource, RecordedPages,
};
pub use scoring::{score_race, RaceScore};
pub use season::{Race, ResultFormat, ResultSource, RosterKind, RosterSourceConfig, Season};
pub use standings::{StandingRow, Standings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
