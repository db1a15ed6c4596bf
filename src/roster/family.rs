// 👪 Family-roster fragments
//
// A family signup lists dependents as free text in one cell, e.g.
//   "Bob Smith M 03 15 1980; Alice F 1990 | Tim, male, March 4 2012"
// Each fragment is decomposed into name, gender and birth date. Bad
// fragments become `Error::Fragment` so the loader can log and skip them.

use crate::error::{Error, Result};
use crate::result::Gender;
use chrono::NaiveDate;

/// Two-digit years at or below this are 2000s, above are 1900s
const CENTURY_PIVOT: i32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct FamilyMember {
    pub name: String,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
}

/// Split a family cell into one fragment per dependent
pub fn split_family_cell(cell: &str) -> Vec<&str> {
    cell.split(|c| c == ';' || c == '|' || c == '\n')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect()
}

fn is_number(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn gender_marker(token: &str) -> Option<Gender> {
    match token.to_lowercase().as_str() {
        "m" | "male" => Some(Gender::Male),
        "f" | "female" => Some(Gender::Female),
        "n" | "nonbinary" | "non-binary" => Some(Gender::NonBinary),
        _ => None,
    }
}

fn month_number(token: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = token.to_lowercase();
    if lower.len() < 3 || !lower.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
}

fn expand_year(text: &str) -> Option<i32> {
    let value: i32 = text.parse().ok()?;
    match text.len() {
        4 => Some(value),
        2 if value <= CENTURY_PIVOT => Some(2000 + value),
        2 => Some(1900 + value),
        _ => None,
    }
}

/// Tokenize on whitespace, commas and slashes; dashed numeric dates split too
fn tokenize(fragment: &str) -> Vec<String> {
    fragment
        .split(|c: char| c.is_whitespace() || c == ',' || c == '/' || c == '\\')
        .filter(|t| !t.is_empty())
        .flat_map(|t| {
            let parts: Vec<&str> = t.split('-').collect();
            if parts.len() > 1 && parts.iter().all(|p| is_number(p)) {
                parts.into_iter().map(str::to_string).collect::<Vec<_>>()
            } else {
                vec![t.to_string()]
            }
        })
        .collect()
}

/// Parse one dependent fragment, filling a lone given name with `family_name`
pub fn parse_family_member(fragment: &str, family_name: &str) -> Result<FamilyMember> {
    let mut tokens: Vec<String> = tokenize(fragment)
        .into_iter()
        .filter(|t| !t.contains('@'))
        .collect();

    // 1. Gender marker
    let mut gender = None;
    if let Some(pos) = tokens.iter().rposition(|t| gender_marker(t).is_some()) {
        gender = gender_marker(&tokens[pos]);
        tokens.remove(pos);
    }

    // 2. Birth date from the first run of numbers
    let mut birth_date = None;
    if let Some(start) = tokens.iter().position(|t| is_number(t)) {
        let run = tokens[start..].iter().take_while(|t| is_number(t)).count().min(3);
        let numbers: Vec<String> = tokens.drain(start..start + run).collect();

        birth_date = match numbers.as_slice() {
            [a, b, c] => {
                let year = expand_year(c)
                    .ok_or_else(|| Error::fragment(fragment, format!("'{}' is not a year", c)))?;
                let (a, b): (u32, u32) = (a.parse().unwrap_or(0), b.parse().unwrap_or(0));
                // Day-month-year first, then month-day-year
                let date = NaiveDate::from_ymd_opt(year, b, a).or_else(|| NaiveDate::from_ymd_opt(year, a, b));
                Some(date.ok_or_else(|| Error::fragment(fragment, "numbers do not form a date"))?)
            }
            [day_or_month, y] => {
                let year = expand_year(y)
                    .ok_or_else(|| Error::fragment(fragment, format!("'{}' is not a year", y)))?;
                let n: u32 = day_or_month.parse().unwrap_or(0);
                let month_name = start.checked_sub(1).and_then(|i| month_number(&tokens[i]));
                let date = match month_name {
                    Some(month) => {
                        tokens.remove(start - 1);
                        NaiveDate::from_ymd_opt(year, month, n)
                    }
                    None => NaiveDate::from_ymd_opt(year, n, 1),
                };
                Some(date.ok_or_else(|| Error::fragment(fragment, "numbers do not form a date"))?)
            }
            [y] => expand_year(y).and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)),
            _ => None,
        };
    }

    // 3. What remains is the name
    let name_tokens: Vec<&str> = tokens
        .iter()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty() && !is_number(t))
        .collect();

    let name = match name_tokens.as_slice() {
        [] => return Err(Error::fragment(fragment, "no name found")),
        [given] => format!("{} {}", given, family_name.trim()).trim().to_string(),
        all => all.join(" "),
    };

    Ok(FamilyMember {
        name,
        gender,
        birth_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_fragment() {
        let member = parse_family_member("Bob Smith M 03 15 1980", "Jones").unwrap();
        assert_eq!(member.name, "Bob Smith");
        assert_eq!(member.gender, Some(Gender::Male));
        assert_eq!(member.birth_date, Some(date(1980, 3, 15)));
    }

    #[test]
    fn test_year_only_uses_family_name() {
        let member = parse_family_member("Alice F 1990", "Smith").unwrap();
        assert_eq!(member.name, "Alice Smith");
        assert_eq!(member.gender, Some(Gender::Female));
        assert_eq!(member.birth_date, Some(date(1990, 1, 1)));
    }

    #[test]
    fn test_day_month_year_order() {
        let member = parse_family_member("Ann Lee F 25 12 2010", "Lee").unwrap();
        assert_eq!(member.birth_date, Some(date(2010, 12, 25)));
    }

    #[test]
    fn test_month_name_and_email() {
        let member = parse_family_member("Tim, male, March 4 2012, tim@example.com", "Smith").unwrap();
        assert_eq!(member.name, "Tim Smith");
        assert_eq!(member.gender, Some(Gender::Male));
        assert_eq!(member.birth_date, Some(date(2012, 3, 4)));
    }

    #[test]
    fn test_dashed_date_and_stray_markers() {
        let member = parse_family_member("Sam - Smith : 07-04-1999 F", "Smith").unwrap();
        assert_eq!(member.name, "Sam Smith");
        assert_eq!(member.birth_date, Some(date(1999, 4, 7)));
    }

    #[test]
    fn test_two_digit_year() {
        let member = parse_family_member("Kai N 05", "Ito").unwrap();
        assert_eq!(member.birth_date, Some(date(2005, 1, 1)));
        assert_eq!(member.gender, Some(Gender::NonBinary));
    }

    #[test]
    fn test_malformed_fragments() {
        assert!(matches!(parse_family_member("F 2001", "Smith"), Err(Error::Fragment { .. })));
        assert!(matches!(parse_family_member("Kid 13 45 2010", "Smith"), Err(Error::Fragment { .. })));
    }

    #[test]
    fn test_split_family_cell() {
        let fragments = split_family_cell("Bob M 1980; Alice F 1990 |\nTim M 2012;;");
        assert_eq!(fragments, vec!["Bob M 1980", "Alice F 1990", "Tim M 2012"]);
    }
}
