// 👤 Member Entity - one club-roster entrant
//
// A member is created by a roster loader, keyed by the directory, merged
// with same-person records from other rosters, and collects the scored
// results of the current season.

use crate::division::Division;
use crate::result::{Gender, RaceResult};
use crate::season::RosterKind;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

// ============================================================================
// MEMBERSHIP TERM
// ============================================================================

/// Inclusive range of calendar years a membership covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTerm {
    pub start_year: i32,
    pub end_year: i32,
}

impl MembershipTerm {
    /// Build a term; an end before the start collapses to a single year
    pub fn new(start_year: i32, end_year: i32) -> Self {
        MembershipTerm {
            start_year,
            end_year: end_year.max(start_year),
        }
    }

    pub fn covers(&self, year: i32) -> bool {
        (self.start_year..=self.end_year).contains(&year)
    }

    /// Smallest term covering both
    pub fn union(&self, other: &MembershipTerm) -> MembershipTerm {
        MembershipTerm {
            start_year: self.start_year.min(other.start_year),
            end_year: self.end_year.max(other.end_year),
        }
    }
}

// ============================================================================
// MEMBERSHIP RULES
// ============================================================================

static SPECIAL_QUANTITY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Special Quantity:\s*(\d+)").ok());

/// How signup metadata turns into a membership term
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipRules {
    /// Submissions in or after this month start next calendar year
    pub cutoff_month: u32,

    /// Product phrases that each pay for one year
    pub renewal_phrases: Vec<String>,
}

impl MembershipRules {
    pub fn new(cutoff_month: u32) -> Self {
        MembershipRules {
            cutoff_month,
            renewal_phrases: vec![
                "Renew 1 Year".to_string(),
                "New Individual".to_string(),
                "New Family".to_string(),
                "Renew Family".to_string(),
            ],
        }
    }

    /// Years paid by a products string: one per renewal phrase plus any
    /// "Special Quantity: N"
    pub fn years_paid(&self, products: &str) -> i32 {
        let phrases = self
            .renewal_phrases
            .iter()
            .filter(|phrase| products.contains(phrase.as_str()))
            .count() as i32;

        let special = SPECIAL_QUANTITY
            .as_ref()
            .and_then(|re| re.captures(products))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .unwrap_or(0);

        phrases + special
    }

    /// Term bought by a signup submitted at `submitted`.
    ///
    /// A signup that paid for no membership year gets a term that had
    /// already lapsed the year before it was submitted.
    pub fn term_from_signup(&self, submitted: NaiveDateTime, products: &str) -> MembershipTerm {
        let years = self.years_paid(products);
        if years == 0 {
            let lapsed = submitted.year() - 1;
            return MembershipTerm::new(lapsed, lapsed);
        }
        let mut start = submitted.year();
        if submitted.month() >= self.cutoff_month {
            start += 1;
        }
        MembershipTerm::new(start, start - 1 + years)
    }

    /// Term ending with an authoritative expiration date
    pub fn term_from_expiration(&self, expiration: NaiveDate) -> MembershipTerm {
        MembershipTerm::new(expiration.year() - 1, expiration.year())
    }
}

impl Default for MembershipRules {
    fn default() -> Self {
        Self::new(9)
    }
}

// ============================================================================
// MEMBER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl Contact {
    /// Fill whichever fields are missing here from `other`
    fn backfill(&mut self, other: &Contact) {
        if self.email.is_none() {
            self.email = other.email.clone();
        }
        if self.address.is_none() {
            self.address = other.address.clone();
        }
        if self.phone.is_none() {
            self.phone = other.phone.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub name: String,

    /// Normalized matching key, assigned by the directory
    pub key: String,

    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub term: MembershipTerm,
    pub contact: Contact,
    pub products: Option<String>,
    pub submitted: Option<NaiveDateTime>,
    pub source: RosterKind,

    /// Derived from birth date and gender
    pub division: Option<Division>,

    /// Scored results this season, in scoring order
    pub results: Vec<RaceResult>,
}

impl Member {
    pub fn new(name: impl Into<String>, term: MembershipTerm, source: RosterKind) -> Self {
        Member {
            name: name.into(),
            key: String::new(),
            birth_date: None,
            gender: None,
            term,
            contact: Contact::default(),
            products: None,
            submitted: None,
            source,
            division: None,
            results: Vec::new(),
        }
    }

    pub fn with_birth_date(mut self, birth_date: Option<NaiveDate>) -> Self {
        self.birth_date = birth_date;
        self
    }

    pub fn with_gender(mut self, gender: Option<Gender>) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contact = contact;
        self
    }

    pub fn with_products(mut self, products: Option<String>, submitted: Option<NaiveDateTime>) -> Self {
        self.products = products;
        self.submitted = submitted;
        self
    }

    /// Age in whole years on `date`
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let born = self.birth_date?;
        let mut age = date.year() - born.year();
        if (date.month(), date.day()) < (born.month(), born.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }

    pub fn is_active(&self, year: i32) -> bool {
        self.term.covers(year)
    }

    /// Membership ended before `year`
    pub fn has_lapsed(&self, year: i32) -> bool {
        self.term.end_year < year
    }

    /// Recompute the division for the season's reference date
    pub fn refresh_division(&mut self, as_of: NaiveDate) {
        self.division = Division::resolve(self.gender, self.age_on(as_of));
    }

    /// Fold a same-person record into this one.
    ///
    /// Missing fields are copied across; products and submission date are
    /// replaced when the incoming record was submitted later. Returns true
    /// if the birth date changed.
    pub fn absorb(&mut self, other: Member) -> bool {
        let mut birth_changed = false;

        if self.gender.is_none() {
            self.gender = other.gender;
        }
        if self.birth_date.is_none() && other.birth_date.is_some() {
            self.birth_date = other.birth_date;
            birth_changed = true;
        }
        self.contact.backfill(&other.contact);

        let newer = match (self.submitted, other.submitted) {
            (Some(mine), Some(theirs)) => theirs > mine,
            (None, Some(_)) => true,
            _ => false,
        };
        if newer {
            self.products = other.products;
            self.submitted = other.submitted;
        } else if self.products.is_none() {
            self.products = other.products;
        }

        self.term = self.term.union(&other.term);
        birth_changed
    }

    pub fn add_result(&mut self, result: RaceResult) {
        self.results.push(result);
    }

    /// Division shown in standings: that of the latest scored result
    pub fn standings_division(&self) -> Option<Division> {
        self.results
            .iter()
            .rev()
            .find_map(|r| r.division)
            .or(self.division)
    }
}

// ============================================================================
// TESTS
// ============================================================================
