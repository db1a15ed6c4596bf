// 🔤 Name normalization
//
// Builds the matching key used everywhere a name is compared:
//   "José-Luis O'Neil Jr." -> "jos luis oneil"
// Accents fold away, punctuation drops, hyphens split, generational
// suffixes vanish, and the given name is cut to a short prefix so
// "Rob Smith" and "Robert Smith" share a key.

use crate::error::{open_source, Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const SUFFIXES: [&str; 5] = ["jr", "sr", "ii", "iii", "iv"];

/// Explicitly constructed, passed-in normalization resource
#[derive(Debug, Clone, PartialEq)]
pub struct NameNormalizer {
    /// Characters of the given name kept in the key
    pub prefix_len: usize,

    /// Folded nickname -> folded canonical given name
    nicknames: HashMap<String, String>,
}

impl NameNormalizer {
    pub fn new(prefix_len: usize) -> Self {
        NameNormalizer {
            prefix_len,
            nicknames: HashMap::new(),
        }
    }

    pub fn with_nicknames<I, S>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        for (nickname, canonical) in pairs {
            let nickname = fold(nickname.as_ref());
            let canonical = fold(canonical.as_ref());
            if !nickname.is_empty() && !canonical.is_empty() {
                self.nicknames.insert(nickname, canonical);
            }
        }
        self
    }

    /// Load a two-column CSV of `nickname,name` pairs (no header row
    /// required; a first row reading "nickname" is skipped)
    pub fn from_nickname_file(prefix_len: usize, path: &Path) -> Result<Self> {
        let file = open_source(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut pairs = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| Error::malformed(path, e.to_string()))?;
            match (record.get(0), record.get(1)) {
                (Some(nick), Some(name)) if !nick.eq_ignore_ascii_case("nickname") => {
                    pairs.push((nick.to_string(), name.to_string()));
                }
                _ => continue,
            }
        }

        info!(path = %path.display(), nicknames = pairs.len(), "Loaded nickname table");
        Ok(NameNormalizer::new(prefix_len).with_nicknames(pairs))
    }

    pub fn nickname_count(&self) -> usize {
        self.nicknames.len()
    }

    /// Matching key for a display name
    pub fn normalize(&self, name: &str) -> String {
        let folded = fold(name);
        let tokens: Vec<&str> = folded
            .split_whitespace()
            .filter(|t| !SUFFIXES.contains(t))
            .collect();

        if tokens.len() < 2 {
            return tokens.join(" ");
        }

        let canonical = self
            .nicknames
            .get(tokens[0])
            .map(String::as_str)
            .unwrap_or(tokens[0]);
        let given: String = canonical.chars().take(self.prefix_len).collect();
        format!("{} {}", given, tokens[1..].join(" "))
    }
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Accent-free lowercase words; hyphens become spaces, other punctuation goes
fn fold(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == '-' { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_normalize_basic() {
        let n = NameNormalizer::new(3);
        assert_eq!(n.normalize("Robert Smith"), "rob smith");
        assert_eq!(n.normalize("  ROB   smith "), "rob smith");
        assert_eq!(n.normalize("José-Luis O'Neil Jr."), "jos luis oneil");
    }

    #[test]
    fn test_short_given_name_kept() {
        let n = NameNormalizer::new(3);
        assert_eq!(n.normalize("Al Green"), "al green");
        assert_eq!(n.normalize("Cher"), "cher");
    }

    #[test]
    fn test_nicknames_canonicalize_before_truncation() {
        let n = NameNormalizer::new(3).with_nicknames([("Bob", "Robert"), ("Bill", "William")]);
        assert_eq!(n.normalize("Bob Smith"), n.normalize("Robert Smith"));
        assert_eq!(n.normalize("Bill Jones"), "wil jones");
    }

    #[test]
    fn test_nickname_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nicknames.csv");
        fs::write(&path, "nickname,name\nbob,robert\nPeggy,Margaret\n").unwrap();

        let n = NameNormalizer::from_nickname_file(3, &path).unwrap();
        assert_eq!(n.nickname_count(), 2);
        assert_eq!(n.normalize("Peggy Olson"), "mar olson");
    }

    #[test]
    fn test_missing_nickname_file() {
        let err = NameNormalizer::from_nickname_file(3, Path::new("/nope/nick.csv")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
