use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ApertureFlux, TableRow};
use crate::error::{Error, Result};

/// Leading columns every table carries, in order.
pub const FIXED_COLUMNS: [&str; 4] = ["tag", "aperture", "name", "obs_time"];

/// Declared column layout of an incoming measurement table: the fixed
/// columns followed by a `flux_<ap>` / `snr_<ap>` pair per aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableFormat {
    pub apertures: Vec<String>,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            apertures: vec!["r1".to_string()],
        }
    }
}

impl TableFormat {
    pub fn column_count(&self) -> usize {
        FIXED_COLUMNS.len() + 2 * self.apertures.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
        for ap in &self.apertures {
            names.push(format!("flux_{ap}"));
            names.push(format!("snr_{ap}"));
        }
        names
    }

    pub fn aperture_index(&self, aperture: &str) -> Result<usize> {
        self.apertures
            .iter()
            .position(|a| a == aperture)
            .ok_or_else(|| Error::UnknownAperture(aperture.to_string()))
    }
}

/// Read and parse a table file.
pub fn read_table(path: &Path, format: &TableFormat) -> Result<Vec<TableRow>> {
    let content = fs::read_to_string(path)?;
    parse_table(&content, format)
}

/// Parse whitespace-delimited rows. Blank lines and `#` comments are skipped;
/// any other line must match the declared format exactly.
pub fn parse_table(content: &str, format: &TableFormat) -> Result<Vec<TableRow>> {
    let mut rows = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        rows.push(parse_row(line, trimmed, format)?);
    }
    Ok(rows)
}

fn parse_row(line: usize, text: &str, format: &TableFormat) -> Result<TableRow> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != format.column_count() {
        return Err(malformed(
            line,
            format!(
                "expected {} columns ({}), found {}",
                format.column_count(),
                format.column_names().join(" "),
                fields.len()
            ),
        ));
    }

    let aperture_key: i64 = fields[1]
        .parse()
        .map_err(|_| malformed(line, format!("aperture is not an integer: {:?}", fields[1])))?;
    let obs_time = parse_float(line, "obs_time", fields[3])?;

    let mut apertures = Vec::with_capacity(format.apertures.len());
    for (i, ap) in format.apertures.iter().enumerate() {
        let base = FIXED_COLUMNS.len() + 2 * i;
        let flux = parse_float(line, &format!("flux_{ap}"), fields[base])?;
        let snr = parse_float(line, &format!("snr_{ap}"), fields[base + 1])?;
        if snr <= 0.0 {
            return Err(malformed(line, format!("snr_{ap} must be positive, got {snr}")));
        }
        apertures.push(ApertureFlux { flux, snr });
    }

    Ok(TableRow {
        line,
        tag: fields[0].to_string(),
        aperture_key,
        name: fields[2].to_string(),
        obs_time,
        apertures,
    })
}

fn parse_float(line: usize, column: &str, field: &str) -> Result<f64> {
    let value: f64 = field
        .parse()
        .map_err(|_| malformed(line, format!("{column} is not a number: {field:?}")))?;
    if !value.is_finite() {
        return Err(malformed(line, format!("{column} is not finite: {field:?}")));
    }
    Ok(value)
}

fn malformed(line: usize, message: String) -> Error {
    Error::MalformedInput { line, message }
}
