// 🏷️ Divisions - age band + gender groupings
// One youth band covers ages 0-19, then one band per decade from 20 upward.

use crate::result::Gender;
use serde::{Serialize, Serializer};
use std::fmt;

/// Upper bound (inclusive) of the youth band
pub const YOUTH_BAND_MAX: u32 = 19;

// ============================================================================
// DIVISION
// ============================================================================

/// Division - gender + inclusive age band
///
/// Ordering groups by gender first, then by ascending age band, which is
/// the order standings are printed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Division {
    pub gender: Gender,
    pub low: u32,
    pub high: u32,
}

impl Division {
    /// Band for an age. Total over all ages: every age lands in exactly one band.
    pub fn for_age(gender: Gender, age: u32) -> Self {
        if age <= YOUTH_BAND_MAX {
            Division {
                gender,
                low: 0,
                high: YOUTH_BAND_MAX,
            }
        } else {
            let low = (age / 10) * 10;
            Division {
                gender,
                low,
                high: low + 9,
            }
        }
    }

    /// Division when both inputs are known
    pub fn resolve(gender: Option<Gender>, age: Option<u32>) -> Option<Self> {
        Some(Division::for_age(gender?, age?))
    }

    pub fn contains(&self, age: u32) -> bool {
        self.low <= age && age <= self.high
    }

    /// Compact key, e.g. "F3039". The youth band keeps the "0119" key results
    /// sheets have always used.
    pub fn key(&self) -> String {
        if self.low == 0 {
            format!("{}01{}", self.gender.tag(), self.high)
        } else {
            format!("{}{}{}", self.gender.tag(), self.low, self.high)
        }
    }

    /// Human-readable name for report headers
    pub fn label(&self) -> String {
        let band = if self.low == 0 {
            format!("{} & under", self.high)
        } else {
            format!("{}-{}", self.low, self.high)
        };
        format!("{} {}", self.gender.plural(), band)
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

// Serialized as its key so a division-keyed map renders as a JSON object
impl Serialize for Division {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

// ============================================================================
// TESTS
// ============================================================================
