// 👥 Roster - club members from every roster source, merged into one directory

pub mod directory;
pub mod family;
pub mod matching;
pub mod member;
pub mod normalize;
pub mod sources;

pub use directory::{Candidate, Lookup, MemberDirectory, MergeReport};
pub use family::{parse_family_member, split_family_cell, FamilyMember};
pub use matching::{scorer_for, JaroWinkler, SimilarityScorer, TokenSortRatio};
pub use member::{Contact, Member, MembershipRules, MembershipTerm};
pub use normalize::NameNormalizer;
pub use sources::{load_legacy, load_remote, load_signup, RecordedPages, RosterPage, RosterPageSource};

use crate::error::Result;
use crate::season::{RosterKind, RosterSourceConfig};

/// Load one configured roster source
pub fn load_roster(source: &RosterSourceConfig, rules: &MembershipRules) -> Result<Vec<Member>> {
    match source.kind {
        RosterKind::Legacy => load_legacy(&source.path, rules),
        RosterKind::Signup => load_signup(&source.path, false, rules),
        RosterKind::Family => load_signup(&source.path, true, rules),
        RosterKind::Remote => {
            let mut pages = RecordedPages::from_file(&source.path)?;
            load_remote(&mut pages, rules)
        }
    }
}
