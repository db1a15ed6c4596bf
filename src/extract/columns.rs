// 🗂️ Column schema - declarative columns built from a header row
//
// A header word fixes its column's left offset; the next header word's
// offset becomes its right bound. Cell values are then a pure function of
// (row, schema): every word whose span fits in the window, space-joined.

use super::layout::Word;

// ============================================================================
// FIELDS
// ============================================================================

/// Result fields a source column can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Place,
    Name,
    Time,
    Pace,
    Age,
    Gender,
    City,
    State,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Place,
        Field::Name,
        Field::Time,
        Field::Pace,
        Field::Age,
        Field::Gender,
        Field::City,
        Field::State,
    ];

    /// Header spellings recognized for this field (lowercase)
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Place => &["place", "overall place", "pl", "pos", "rank"],
            Field::Name => &["name", "runner", "athlete", "participant"],
            Field::Time => &["time", "chiptime", "chip time", "nettime", "finish"],
            Field::Pace => &["pace", "min/mi", "/mi", "pace/mi"],
            Field::Age => &["age", "ag"],
            Field::Gender => &["sex", "s", "gender", "m/f", "g"],
            Field::City => &["city", "town", "hometown"],
            Field::State => &["state", "st", "prov"],
        }
    }

    pub fn from_label(label: &str) -> Option<Field> {
        let label = label.trim().to_lowercase();
        Field::ALL
            .into_iter()
            .find(|field| field.aliases().contains(&label.as_str()))
    }

    pub fn name(&self) -> &'static str {
        self.aliases()[0]
    }
}

// ============================================================================
// COLUMN SCHEMA
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Header text as it appeared
    pub label: String,
    pub field: Option<Field>,
    pub offset: f64,
    pub right_bound: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    columns: Vec<Column>,
    epsilon: f64,
}

impl ColumnSchema {
    /// A header row names at least the place, name and time columns
    pub fn is_header(row: &[Word]) -> bool {
        let has = |wanted: Field| {
            row.iter()
                .any(|w| Field::from_label(&w.text) == Some(wanted))
        };
        has(Field::Place) && has(Field::Name) && has(Field::Time)
    }

    /// Build the schema from a header row (words sorted left to right)
    pub fn from_header(row: &[Word], epsilon: f64) -> Self {
        let mut columns: Vec<Column> = Vec::with_capacity(row.len());

        for word in row {
            if let Some(previous) = columns.last_mut() {
                previous.right_bound = word.x0;
            }
            columns.push(Column {
                label: word.text.clone(),
                field: Field::from_label(&word.text),
                offset: word.x0,
                right_bound: f64::INFINITY,
            });
        }

        ColumnSchema { columns, epsilon }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has(&self, field: Field) -> bool {
        self.column(field).is_some()
    }

    fn column(&self, field: Field) -> Option<&Column> {
        self.columns.iter().find(|c| c.field == Some(field))
    }

    /// Cell value for `field` in `row`, or None if the column is absent or empty
    pub fn value(&self, row: &[Word], field: Field) -> Option<String> {
        let column = self.column(field)?;
        let parts: Vec<&str> = row
            .iter()
            .filter(|w| {
                w.x0 >= column.offset - self.epsilon && w.x1 <= column.right_bound + self.epsilon
            })
            .map(|w| w.text.as_str())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::layout::{group_rows, words_from_text};

    fn rows(text: &str) -> Vec<Vec<Word>> {
        group_rows(&words_from_text(text), 5.0)
    }

    #[test]
    fn test_field_aliases() {
        assert_eq!(Field::from_label("Sex"), Some(Field::Gender));
        assert_eq!(Field::from_label("M/F"), Some(Field::Gender));
        assert_eq!(Field::from_label("ST"), Some(Field::State));
        assert_eq!(Field::from_label("Place"), Some(Field::Place));
        assert_eq!(Field::from_label("Bib"), None);
    }

    #[test]
    fn test_header_detection() {
        let rows = rows("Place Name Time\nOverall Results");
        assert!(ColumnSchema::is_header(&rows[0]));
        assert!(!ColumnSchema::is_header(&rows[1]));
    }

    #[test]
    fn test_multi_word_values() {
        let text = "\
Place Name            Age Sex City           St Time
1     Mary Ann Jones  34  F   Eden Prairie   MN 20:01";
        let rows = rows(text);
        let schema = ColumnSchema::from_header(&rows[0], 0.01);

        assert_eq!(schema.value(&rows[1], Field::Name), Some("Mary Ann Jones".to_string()));
        assert_eq!(schema.value(&rows[1], Field::City), Some("Eden Prairie".to_string()));
        assert_eq!(schema.value(&rows[1], Field::State), Some("MN".to_string()));
        assert_eq!(schema.value(&rows[1], Field::Time), Some("20:01".to_string()));
        assert_eq!(schema.value(&rows[1], Field::Pace), None);
    }

    #[test]
    fn test_empty_cell_is_none() {
        let text = "\
Place Name        City      Time
2     Bob Stone             21:30";
        let rows = rows(text);
        let schema = ColumnSchema::from_header(&rows[0], 0.01);

        assert_eq!(schema.value(&rows[1], Field::City), None);
        assert_eq!(schema.value(&rows[1], Field::Name), Some("Bob Stone".to_string()));
    }

    #[test]
    fn test_unknown_header_keeps_its_window() {
        let text = "\
Place Bib  Name       Time
1     101  Al Green   18:00";
        let rows = rows(text);
        let schema = ColumnSchema::from_header(&rows[0], 0.01);

        // The bib number stays inside the unknown column and out of the name
        assert_eq!(schema.columns()[1].field, None);
        assert_eq!(schema.value(&rows[1], Field::Name), Some("Al Green".to_string()));
        assert_eq!(schema.value(&rows[1], Field::Place), Some("1".to_string()));
    }

    #[test]
    fn test_last_column_unbounded() {
        let rows = rows("Place Name Time\n1     Al   1:02:03.4");
        let schema = ColumnSchema::from_header(&rows[0], 0.01);
        assert_eq!(schema.columns().last().map(|c| c.right_bound), Some(f64::INFINITY));
        assert_eq!(schema.value(&rows[1], Field::Time), Some("1:02:03.4".to_string()));
    }
}
