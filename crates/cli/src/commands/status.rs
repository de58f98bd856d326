use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use photmerge_core::{digest, Archive, RecordStatus};

/// Totals shown under the record table.
#[derive(Debug, PartialEq)]
pub(crate) struct Totals {
    pub(crate) records: usize,
    pub(crate) measurements: usize,
    pub(crate) tagged: usize,
    pub(crate) with_backup: usize,
}

pub(crate) fn compute_totals(records: &[RecordStatus]) -> Totals {
    Totals {
        records: records.len(),
        measurements: records.iter().map(|r| r.measurements).sum(),
        tagged: records.iter().filter_map(|r| r.tagged).sum(),
        with_backup: records.iter().filter(|r| !r.backups.is_empty()).count(),
    }
}

pub fn run(archive: &Archive, marker: &str) -> Result<()> {
    let records = archive.status(Some(marker))?;

    println!();
    println!("  Archive: {}", archive.root().display());
    println!();

    if records.is_empty() {
        println!("  No records found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Target"),
        Cell::new("Lines"),
        Cell::new("Entries"),
        Cell::new(marker),
        Cell::new("Backups"),
        Cell::new("SHA-256"),
        Cell::new("Modified"),
    ]);

    for record in &records {
        let tagged = record.tagged.unwrap_or(0);
        let tagged_cell = if tagged == 0 {
            Cell::new(tagged).fg(Color::DarkGrey)
        } else {
            Cell::new(tagged).fg(Color::Green)
        };
        let backups = if record.backups.is_empty() {
            "-".to_string()
        } else {
            record.backups.join(", ")
        };
        let modified = record
            .modified
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        table.add_row(vec![
            Cell::new(record.id.as_str()),
            Cell::new(record.lines),
            Cell::new(record.measurements),
            tagged_cell,
            Cell::new(backups),
            Cell::new(digest::short(&record.sha256)),
            Cell::new(modified),
        ]);
    }

    println!("{table}");

    let totals = compute_totals(&records);
    println!();
    println!(
        "  {} records, {} entries, {} {marker} lines, {} with backups",
        totals.records, totals.measurements, totals.tagged, totals.with_backup
    );
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use photmerge_core::domain::TargetId;
    use std::path::PathBuf;

    fn status(id: &str, measurements: usize, tagged: Option<usize>, backups: &[&str]) -> RecordStatus {
        RecordStatus {
            id: TargetId::new(id),
            path: PathBuf::from(format!("/archive/{id}.dat")),
            lines: measurements + 1,
            measurements,
            tagged,
            backups: backups.iter().map(|b| b.to_string()).collect(),
            sha256: "0".repeat(64),
            modified: None,
        }
    }

    #[test]
    fn test_compute_totals() {
        let records = vec![
            status("hd029647", 4, Some(2), &["mips24"]),
            status("hd037903", 1, Some(0), &[]),
            status("bd+63d1964", 2, None, &["irac", "mips24"]),
        ];
        assert_eq!(
            compute_totals(&records),
            Totals {
                records: 3,
                measurements: 7,
                tagged: 2,
                with_backup: 2,
            }
        );
    }

    #[test]
    fn test_compute_totals_empty() {
        assert_eq!(
            compute_totals(&[]),
            Totals {
                records: 0,
                measurements: 0,
                tagged: 0,
                with_backup: 0,
            }
        );
    }
}
