// 🏃 Race Results - one finisher in one race
// Created by an extractor, then touched by membership resolution and scoring.

use crate::division::Division;
use serde::{Deserialize, Serialize};

// ============================================================================
// GENDER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    NonBinary,
}

impl Gender {
    /// Single-letter tag used in division keys
    pub fn tag(&self) -> char {
        match self {
            Gender::Female => 'F',
            Gender::Male => 'M',
            Gender::NonBinary => 'N',
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            Gender::Female => "Females",
            Gender::Male => "Males",
            Gender::NonBinary => "Non-binary",
        }
    }

    /// Parse the many spellings sources use ("M", "male", "Women", "nonbinary"...)
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "m" | "male" | "man" | "men" | "boy" | "boys" => Some(Gender::Male),
            "f" | "female" | "w" | "woman" | "women" | "girl" | "girls" => Some(Gender::Female),
            "n" | "x" | "nb" | "nonbinary" | "non-binary" => Some(Gender::NonBinary),
            _ => None,
        }
    }
}

// ============================================================================
// RACE RESULT
// ============================================================================

/// RaceResult - one finisher row, normalized across source formats
///
/// `time` and `pace` are display strings; they are never parsed as durations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceResult {
    // Extracted fields
    pub place: u32,
    pub name: String,
    pub time: String,
    pub pace: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub city: Option<String>,
    pub state: Option<String>,

    // Derived by resolution and scoring
    pub division: Option<Division>,
    pub is_member: bool,
    pub member_key: Option<String>,
    pub points: u32,

    /// Index of the owning race in the season
    pub race_index: usize,
}

impl RaceResult {
    pub fn new(place: u32, name: String, time: String, race_index: usize) -> Self {
        RaceResult {
            place,
            name,
            time,
            pace: None,
            age: None,
            gender: None,
            city: None,
            state: None,
            division: None,
            is_member: false,
            member_key: None,
            points: 0,
            race_index,
        }
    }

    pub fn with_pace(mut self, pace: Option<String>) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_age(mut self, age: Option<u32>) -> Self {
        self.age = age;
        self
    }

    pub fn with_gender(mut self, gender: Option<Gender>) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_location(mut self, city: Option<String>, state: Option<String>) -> Self {
        self.city = city;
        self.state = state;
        self
    }

    /// Recompute the division from the current age and gender
    pub fn set_division(&mut self) {
        self.division = Division::resolve(self.gender, self.age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse_variants() {
        assert_eq!(Gender::parse("M"), Some(Gender::Male));
        assert_eq!(Gender::parse(" female "), Some(Gender::Female));
        assert_eq!(Gender::parse("Women"), Some(Gender::Female));
        assert_eq!(Gender::parse("Non-Binary"), Some(Gender::NonBinary));
        assert_eq!(Gender::parse("?"), None);
        assert_eq!(Gender::parse(""), None);
    }

    #[test]
    fn test_builder_and_division() {
        let mut result = RaceResult::new(3, "Jane Doe".to_string(), "21:04".to_string(), 0)
            .with_age(Some(34))
            .with_gender(Some(Gender::Female))
            .with_location(Some("Rochester".to_string()), Some("MN".to_string()));

        assert_eq!(result.division, None);
        result.set_division();
        assert_eq!(result.division.map(|d| d.key()), Some("F3039".to_string()));
        assert_eq!(result.points, 0);
        assert!(!result.is_member);
    }

    #[test]
    fn test_division_stays_empty_without_gender() {
        let mut result = RaceResult::new(1, "Pat Lee".to_string(), "19:59".to_string(), 2)
            .with_age(Some(40));
        result.set_division();
        assert_eq!(result.division, None);
    }
}
