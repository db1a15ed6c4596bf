// 📊 Standings rendering
// Console table, CSV blocks (header + rows + blank row per division), JSON.
// Renderers only read the computed Standings; nothing here derives scores.

use crate::pipeline::SeasonReport;
use crate::standings::Standings;
use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

// ============================================================================
// TEXT
// ============================================================================

pub fn render_text(report: &SeasonReport) -> String {
    TextReport(report).to_string()
}

/// Console rendering of a season report
pub struct TextReport<'a>(pub &'a SeasonReport);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let standings = &report.standings;

        writeln!(f, "Grand Prix {} (as of {})", report.year, report.as_of)?;
        for race in &report.races {
            writeln!(
                f,
                "  {}. {} {} - {} finishers, {} members scored",
                race.index + 1,
                race.date,
                race.name,
                race.finishers,
                race.members_scored
            )?;
        }

        let name_width = standings
            .divisions
            .values()
            .flatten()
            .map(|r| r.name.chars().count())
            .max()
            .unwrap_or(4)
            .max(4);

        for (division, rows) in &standings.divisions {
            writeln!(f, "\n{} ({})", division.label(), division.key())?;
            write!(f, "{:>5}  {:<width$}", "Place", "Name", width = name_width)?;
            for i in 0..standings.races.len() {
                write!(f, " {:>3}", format!("R{}", i + 1))?;
            }
            writeln!(f, " {:>6} {:>5} {:>5}", format!("Best{}", standings.best_of), "Total", "Races")?;

            for row in rows {
                write!(f, "{:>5}  {:<width$}", row.place, row.name, width = name_width)?;
                for points in &row.points {
                    write!(f, " {:>3}", points)?;
                }
                writeln!(f, " {:>6} {:>5} {:>5}", row.best_total, row.total, row.races_run)?;
            }
        }

        if !report.diagnostics.is_empty() {
            writeln!(f, "\nDiagnostics:")?;
            for diagnostic in &report.diagnostics {
                writeln!(f, "  - {}", diagnostic)?;
            }
        }

        Ok(())
    }
}

// ============================================================================
// CSV
// ============================================================================

/// One block per division: header row, member rows, blank row
pub fn write_csv<W: Write>(standings: &Standings, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    let width = standings.races.len() + 5;

    for (division, rows) in &standings.divisions {
        let mut header = vec![division.label(), "Name".to_string()];
        header.extend(standings.races.iter().cloned());
        header.push(format!("Best {}", standings.best_of));
        header.push("Total".to_string());
        header.push("Races".to_string());
        csv.write_record(&header)?;

        for row in rows {
            let mut record = vec![row.place.to_string(), row.name.clone()];
            record.extend(row.points.iter().map(u32::to_string));
            record.push(row.best_total.to_string());
            record.push(row.total.to_string());
            record.push(row.races_run.to_string());
            csv.write_record(&record)?;
        }

        csv.write_record(vec![""; width])?;
    }

    csv.flush()?;
    Ok(())
}

pub fn write_csv_file(standings: &Standings, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create CSV: {}", path.display()))?;
    write_csv(standings, file).with_context(|| format!("Failed to write CSV: {}", path.display()))
}

// ============================================================================
// JSON
// ============================================================================

pub fn to_json(report: &SeasonReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize season report")
}

pub fn write_json_file(report: &SeasonReport, path: &Path) -> Result<()> {
    std::fs::write(path, to_json(report)?).with_context(|| format!("Failed to write JSON: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::division::Division;
    use crate::pipeline::RaceSummary;
    use crate::resolution::Diagnostic;
    use crate::result::Gender;
    use crate::standings::StandingRow;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn report() -> SeasonReport {
        let row = |place, name: &str, points: Vec<u32>| StandingRow {
            name: name.to_string(),
            total: points.iter().sum(),
            best_total: points.iter().sum(),
            races_run: points.iter().filter(|p| **p > 0).count(),
            points,
            place,
        };
        let mut divisions = BTreeMap::new();
        divisions.insert(
            Division::for_age(Gender::Female, 34),
            vec![row(1, "Jane Doe", vec![10, 9]), row(2, "Ann Lee", vec![9, 0])],
        );
        divisions.insert(Division::for_age(Gender::Male, 15), vec![row(1, "Tim Smith", vec![0, 10])]);

        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        SeasonReport {
            year: 2025,
            as_of: date,
            races: vec![RaceSummary {
                index: 0,
                name: "Spring Classic".to_string(),
                date,
                finishers: 3,
                members_scored: 3,
            }],
            standings: Standings {
                races: vec!["Spring Classic".to_string(), "River Run".to_string()],
                best_of: 5,
                divisions,
            },
            diagnostics: vec![Diagnostic::UnmatchedMember {
                name: "Newt Comer".to_string(),
                roster: "signup.csv".to_string(),
            }],
        }
    }

    #[test]
    fn test_csv_blocks() {
        let mut buffer = Vec::new();
        write_csv(&report().standings, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Females 30-39,Name,Spring Classic,River Run,Best 5,Total,Races");
        assert_eq!(lines[1], "1,Jane Doe,10,9,19,19,2");
        assert_eq!(lines[2], "2,Ann Lee,9,0,9,9,1");
        assert_eq!(lines[3], ",,,,,,");
        assert_eq!(lines[4], "Males 19 & under,Name,Spring Classic,River Run,Best 5,Total,Races");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_text_lists_divisions_and_diagnostics() {
        let text = render_text(&report());
        assert!(text.contains("Females 30-39 (F3039)"));
        assert!(text.contains("Males 19 & under (M0119)"));
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("unmatched member 'Newt Comer' in signup.csv"));
    }

    #[test]
    fn test_text_table_layout() {
        let text = render_text(&report());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Grand Prix 2025 (as of 2025-06-01)");
        assert_eq!(lines[1], "  1. 2025-06-01 Spring Classic - 3 finishers, 3 members scored");
        assert!(lines.contains(&"Place  Name       R1  R2  Best5 Total Races"));
        assert!(lines.contains(&"    1  Jane Doe   10   9     19    19     2"));
        assert!(lines.contains(&"    2  Ann Lee     9   0      9     9     1"));
    }

    #[test]
    fn test_json_keys_by_division() {
        let json = to_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["standings"]["divisions"]["F3039"][0]["name"], "Jane Doe");
        assert_eq!(value["standings"]["divisions"]["M0119"][0]["best_total"], 10);
        assert_eq!(value["diagnostics"][0]["kind"], "unmatched_member");
    }
}
