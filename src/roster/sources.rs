// 📥 Roster loaders
//
// Each roster source becomes a flat list of Members; the directory does
// the keying and merging. Loaders fail for unreadable files and for
// unparseable mandatory dates; a bad single row is logged and skipped.

use super::family::{parse_family_member, split_family_cell};
use super::member::{Contact, Member, MembershipRules};
use crate::error::{open_source, read_source, Error, Result};
use crate::result::Gender;
use crate::season::RosterKind;
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// SHARED PARSING
// ============================================================================

const SUBMISSION_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

const DATE_FORMATS: [&str; 6] = ["%B %d %Y", "%b %d %Y", "%m/%d/%Y", "%m-%d-%Y", "%Y-%m-%d", "%B %d, %Y"];

/// Lenient date parsing for hand-typed birth and expiration dates
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Header-name access into positional csv records
struct Header {
    names: Vec<String>,
}

impl Header {
    fn new(record: &StringRecord) -> Self {
        Header {
            names: record.iter().map(|h| h.trim().to_string()).collect(),
        }
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index(name).and_then(|i| record.get(i))
    }

    fn require(&self, name: &str, path: &Path) -> Result<usize> {
        self.index(name)
            .ok_or_else(|| Error::malformed(path, format!("missing column '{}'", name)))
    }
}

fn csv_reader(path: &Path) -> Result<(Header, csv::Reader<std::fs::File>)> {
    let file = open_source(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| Error::malformed(path, e.to_string()))?
        .clone();
    Ok((Header::new(&headers), reader))
}

// ============================================================================
// SIGNUP EXPORTS
// ============================================================================

const INDIVIDUAL_PRODUCTS: &str = "My Products: Products";
const FAMILY_PRODUCTS: &str = "Please select at least one:: Products";

/// Load a signup-form export. With `family`, dependents listed in the
/// "Family Member" columns become members of their own.
pub fn load_signup(path: &Path, family: bool, rules: &MembershipRules) -> Result<Vec<Member>> {
    let (header, mut reader) = csv_reader(path)?;
    let submission_col = header.require("Submission Date", path)?;
    header.require("First Name", path)?;
    header.require("Last Name", path)?;

    let products_col = if family { FAMILY_PRODUCTS } else { INDIVIDUAL_PRODUCTS };
    let kind = if family { RosterKind::Family } else { RosterKind::Signup };
    let family_cols: Vec<usize> = header
        .names
        .iter()
        .enumerate()
        .filter(|(_, h)| h.starts_with("Family Member") || h.starts_with("Additional Family Member"))
        .map(|(i, _)| i)
        .collect();

    let mut members = Vec::new();
    let mut skipped = 0usize;

    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), line = line + 2, error = %e, "Skipping unreadable signup row");
                skipped += 1;
                continue;
            }
        };

        let submitted_text = record.get(submission_col).unwrap_or("");
        let submitted = NaiveDateTime::parse_from_str(submitted_text, SUBMISSION_FORMAT).map_err(|e| {
            Error::malformed(path, format!("line {}: submission date '{}': {}", line + 2, submitted_text, e))
        })?;

        let first = header.get(&record, "First Name").unwrap_or("");
        let last = header.get(&record, "Last Name").unwrap_or("");
        let name = format!("{} {}", first, last).trim().to_string();
        if name.is_empty() {
            warn!(path = %path.display(), line = line + 2, "Skipping signup row without a name");
            skipped += 1;
            continue;
        }

        let products = text(header.get(&record, products_col));
        let term = rules.term_from_signup(submitted, products.as_deref().unwrap_or(""));

        let primary = Member::new(name, term, kind)
            .with_birth_date(header.get(&record, "Birth Date").and_then(parse_date))
            .with_gender(header.get(&record, "Gender").and_then(Gender::parse))
            .with_contact(Contact {
                email: text(header.get(&record, "Email")),
                address: text(header.get(&record, "Address")),
                phone: text(header.get(&record, "Phone")),
            })
            .with_products(products.clone(), Some(submitted));
        members.push(primary);

        for col in &family_cols {
            let Some(cell) = record.get(*col) else {
                continue;
            };
            for fragment in split_family_cell(cell) {
                match parse_family_member(fragment, last) {
                    Ok(dependent) => {
                        debug!(name = %dependent.name, "Parsed family member");
                        members.push(
                            Member::new(dependent.name, term, kind)
                                .with_birth_date(dependent.birth_date)
                                .with_gender(dependent.gender)
                                .with_products(products.clone(), Some(submitted)),
                        );
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping family member");
                        skipped += 1;
                    }
                }
            }
        }
    }

    info!(path = %path.display(), members = members.len(), skipped, family, "Loaded signup roster");
    Ok(members)
}

// ============================================================================
// LEGACY BASE LIST
// ============================================================================

/// Split "Jane & John Doe" or "Jane, John & Ann Doe" into full names; bare
/// given names borrow the surname of the last full name
fn split_joint_names(cell: &str) -> Vec<String> {
    let parts: Vec<&str> = cell
        .split(|c| c == '&' || c == ',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let surname = parts
        .iter()
        .rev()
        .find(|p| p.split_whitespace().count() > 1)
        .and_then(|p| p.split_whitespace().last());

    parts
        .iter()
        .map(|p| match (p.split_whitespace().count(), surname) {
            (1, Some(surname)) => format!("{} {}", p, surname),
            _ => p.to_string(),
        })
        .collect()
}

/// Load the hand-maintained base list. Expiration dates are authoritative.
pub fn load_legacy(path: &Path, rules: &MembershipRules) -> Result<Vec<Member>> {
    let (header, mut reader) = csv_reader(path)?;
    let name_col = header.require("Name", path)?;
    let expiration_col = header.require("Expiration", path)?;

    let mut members = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::malformed(path, format!("line {}: {}", line + 2, e)))?;

        let cell = record.get(name_col).unwrap_or("");
        let names = split_joint_names(cell);
        if names.is_empty() {
            warn!(path = %path.display(), line = line + 2, "Skipping legacy row without a name");
            continue;
        }

        let expiration_text = record.get(expiration_col).unwrap_or("");
        let expiration = parse_date(expiration_text).ok_or_else(|| {
            Error::malformed(path, format!("line {}: expiration '{}' is not a date", line + 2, expiration_text))
        })?;
        let term = rules.term_from_expiration(expiration);

        // Birth date and gender describe a single person only
        let single = names.len() == 1;
        for name in names {
            let mut member = Member::new(name, term, RosterKind::Legacy).with_contact(Contact {
                email: text(header.get(&record, "Email")),
                ..Contact::default()
            });
            if single {
                member = member
                    .with_birth_date(header.get(&record, "Birth Date").and_then(parse_date))
                    .with_gender(header.get(&record, "Gender").and_then(Gender::parse));
            }
            members.push(member);
        }
    }

    info!(path = %path.display(), members = members.len(), "Loaded legacy roster");
    Ok(members)
}

// ============================================================================
// REMOTE MEMBERSHIP API
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteFields {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Birthday")]
    pub birthday: Option<String>,
    #[serde(rename = "Gender")]
    pub gender: Option<String>,
    #[serde(rename = "Products")]
    pub products: Option<String>,
    #[serde(rename = "Expiration")]
    pub expiration: Option<String>,
    #[serde(rename = "Email")]
    pub email: Option<String>,
    #[serde(rename = "Phone")]
    pub phone: Option<String>,
    #[serde(rename = "Address")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: RemoteFields,
}

/// One page of the membership API
#[derive(Debug, Clone, Deserialize)]
pub struct RosterPage {
    #[serde(default)]
    pub records: Vec<RemoteRecord>,
    /// Token for the next page; absent on the last page
    #[serde(default)]
    pub offset: Option<String>,
}

/// RosterPageSource - transport for the paginated membership API
///
/// Retries and authentication belong to the implementation.
pub trait RosterPageSource {
    fn fetch(&mut self, offset: Option<&str>) -> Result<RosterPage>;
}

/// Pages captured from the API, replayed in order
#[derive(Debug, Clone)]
pub struct RecordedPages {
    pages: Vec<RosterPage>,
}

impl RecordedPages {
    pub fn new(pages: Vec<RosterPage>) -> Self {
        RecordedPages { pages }
    }

    /// A JSON array of pages, as captured
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = read_source(path)?;
        let pages: Vec<RosterPage> =
            serde_json::from_str(&content).map_err(|e| Error::malformed(path, e.to_string()))?;
        Ok(RecordedPages::new(pages))
    }
}

impl RosterPageSource for RecordedPages {
    fn fetch(&mut self, offset: Option<&str>) -> Result<RosterPage> {
        let index = match offset {
            None => 0,
            Some(token) => {
                self.pages
                    .iter()
                    .position(|p| p.offset.as_deref() == Some(token))
                    .map(|i| i + 1)
                    .ok_or_else(|| Error::MalformedInput {
                        source_name: "recorded roster pages".to_string(),
                        reason: format!("no page follows offset '{}'", token),
                    })?
            }
        };

        self.pages.get(index).cloned().ok_or_else(|| Error::MalformedInput {
            source_name: "recorded roster pages".to_string(),
            reason: format!("page {} was not recorded", index + 1),
        })
    }
}

fn remote_member(record: RemoteRecord, rules: &MembershipRules) -> Option<Member> {
    let fields = record.fields;
    let name = text(fields.name.as_deref())?;
    let Some(expiration) = fields.expiration.as_deref().and_then(parse_date) else {
        warn!(id = ?record.id, name = %name, "Skipping remote member without a usable expiration");
        return None;
    };

    Some(
        Member::new(name, rules.term_from_expiration(expiration), RosterKind::Remote)
            .with_birth_date(fields.birthday.as_deref().and_then(parse_date))
            .with_gender(fields.gender.as_deref().and_then(Gender::parse))
            .with_contact(Contact {
                email: text(fields.email.as_deref()),
                address: text(fields.address.as_deref()),
                phone: text(fields.phone.as_deref()),
            })
            .with_products(text(fields.products.as_deref()), None),
    )
}

/// Fetch every page until the feed stops returning an offset
pub fn load_remote(source: &mut dyn RosterPageSource, rules: &MembershipRules) -> Result<Vec<Member>> {
    let mut members = Vec::new();
    let mut seen = HashSet::new();
    let mut offset: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = source.fetch(offset.as_deref())?;
        pages += 1;
        members.extend(page.records.into_iter().filter_map(|r| remote_member(r, rules)));

        match page.offset {
            None => break,
            Some(next) => {
                if !seen.insert(next.clone()) {
                    return Err(Error::MalformedInput {
                        source_name: "remote roster".to_string(),
                        reason: format!("offset '{}' returned twice", next),
                    });
                }
                offset = Some(next);
            }
        }
    }

    info!(pages, members = members.len(), "Loaded remote roster");
    Ok(members)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::member::MembershipTerm;
    use std::fs;

    fn write(name: &str, text: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_date_variants() {
        let expected = NaiveDate::from_ymd_opt(1990, 3, 15);
        assert_eq!(parse_date("March 15 1990"), expected);
        assert_eq!(parse_date("03/15/1990"), expected);
        assert_eq!(parse_date("1990-03-15"), expected);
        assert_eq!(parse_date("March 15, 1990"), expected);
        assert_eq!(parse_date("someday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_load_individual_signup() {
        let (_dir, path) = write(
            "signup.csv",
            "Submission Date,First Name,Last Name,Birth Date,Gender,My Products: Products,Email\n\
             03-01-2025 10:00:00,Jane,Doe,June 15 1990,Female,Renew 1 Year,jane@example.com\n\
             10-02-2025 09:30:00,Bob,Smith,,Male,New Individual Special Quantity: 1,\n",
        );
        let members = load_signup(&path, false, &MembershipRules::new(9)).unwrap();

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "Jane Doe");
        assert_eq!(members[0].term, MembershipTerm::new(2025, 2025));
        assert_eq!(members[0].gender, Some(Gender::Female));
        assert_eq!(members[0].birth_date, NaiveDate::from_ymd_opt(1990, 6, 15));
        assert_eq!(members[0].contact.email.as_deref(), Some("jane@example.com"));
        assert_eq!(members[0].source, RosterKind::Signup);

        // October signup, two years paid
        assert_eq!(members[1].term, MembershipTerm::new(2026, 2027));
        assert_eq!(members[1].birth_date, None);
    }

    #[test]
    fn test_load_family_signup() {
        let (_dir, path) = write(
            "family.csv",
            "Submission Date,First Name,Last Name,Birth Date,Gender,Please select at least one:: Products,Family Member 1,Additional Family Member(s)\n\
             02-10-2025 08:00:00,Ann,Smith,May 2 1982,F,New Family,Bob Smith M 03 15 1980,\"Alice F 1990; ??? \"\n",
        );
        let members = load_signup(&path, true, &MembershipRules::new(9)).unwrap();

        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Ann Smith", "Bob Smith", "Alice Smith"]);
        assert!(members.iter().all(|m| m.source == RosterKind::Family));
        assert!(members.iter().all(|m| m.term == MembershipTerm::new(2025, 2025)));
        assert_eq!(members[1].birth_date, NaiveDate::from_ymd_opt(1980, 3, 15));
        assert_eq!(members[2].birth_date, NaiveDate::from_ymd_opt(1990, 1, 1));
    }

    #[test]
    fn test_bad_submission_date_is_fatal() {
        let (_dir, path) = write(
            "signup.csv",
            "Submission Date,First Name,Last Name,Birth Date,Gender,My Products: Products\n\
             yesterday,Jane,Doe,,F,Renew 1 Year\n",
        );
        let err = load_signup(&path, false, &MembershipRules::new(9)).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_split_joint_names() {
        assert_eq!(split_joint_names("Jane & John Doe"), vec!["Jane Doe", "John Doe"]);
        assert_eq!(
            split_joint_names("Ann, Bo & Cy Ray"),
            vec!["Ann Ray", "Bo Ray", "Cy Ray"]
        );
        assert_eq!(split_joint_names("Li Wei"), vec!["Li Wei"]);
    }

    #[test]
    fn test_load_legacy() {
        let (_dir, path) = write(
            "base.csv",
            "Name,Expiration,Birth Date,Gender\n\
             Jane Doe,12/31/2025,1990-06-15,F\n\
             Al & Bea Green,2024-12-31,1970-01-01,M\n",
        );
        let members = load_legacy(&path, &MembershipRules::new(9)).unwrap();

        assert_eq!(members.len(), 3);
        assert_eq!(members[0].term, MembershipTerm::new(2024, 2025));
        assert_eq!(members[0].gender, Some(Gender::Female));
        assert_eq!(members[1].name, "Al Green");
        assert_eq!(members[2].name, "Bea Green");
        // Shared row: no per-person fields
        assert_eq!(members[1].birth_date, None);
        assert_eq!(members[2].gender, None);
    }

    #[test]
    fn test_legacy_bad_expiration_is_fatal() {
        let (_dir, path) = write("base.csv", "Name,Expiration\nJane Doe,soon\n");
        assert!(load_legacy(&path, &MembershipRules::new(9)).is_err());
    }

    fn page(names: &[&str], offset: Option<&str>) -> RosterPage {
        RosterPage {
            records: names
                .iter()
                .map(|n| RemoteRecord {
                    id: None,
                    fields: RemoteFields {
                        name: Some(n.to_string()),
                        expiration: Some("2025-12-31".to_string()),
                        gender: Some("Male".to_string()),
                        ..RemoteFields::default()
                    },
                })
                .collect(),
            offset: offset.map(str::to_string),
        }
    }

    #[test]
    fn test_load_remote_follows_offsets() {
        let mut pages = RecordedPages::new(vec![
            page(&["Al Green", "Bo Diaz"], Some("p2")),
            page(&["Cy Ray"], Some("p3")),
            page(&["Di Fox"], None),
        ]);
        let members = load_remote(&mut pages, &MembershipRules::new(9)).unwrap();

        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Al Green", "Bo Diaz", "Cy Ray", "Di Fox"]);
        assert!(members.iter().all(|m| m.source == RosterKind::Remote));
        assert!(members.iter().all(|m| m.term.covers(2025)));
    }

    struct LoopingSource;

    impl RosterPageSource for LoopingSource {
        fn fetch(&mut self, _offset: Option<&str>) -> Result<RosterPage> {
            Ok(page(&["Al Green"], Some("again")))
        }
    }

    #[test]
    fn test_remote_repeated_offset_is_fatal() {
        let err = load_remote(&mut LoopingSource, &MembershipRules::new(9)).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_recorded_pages_file() {
        let (_dir, path) = write(
            "pages.json",
            r#"[
                {"records": [{"id": "rec1", "fields": {"Name": "Jane Doe", "Birthday": "1990-06-15",
                  "Gender": "Female", "Expiration": "2025-12-31", "Email": "jane@example.com"}}],
                 "offset": "next"},
                {"records": [{"id": "rec2", "fields": {"Name": "No Expiry"}}]}
            ]"#,
        );
        let mut pages = RecordedPages::from_file(&path).unwrap();
        let members = load_remote(&mut pages, &MembershipRules::new(9)).unwrap();

        assert_eq!(members.len(), 1);
        assert_eq!(members[0].birth_date, NaiveDate::from_ymd_opt(1990, 6, 15));
        assert_eq!(members[0].contact.email.as_deref(), Some("jane@example.com"));
    }
}
