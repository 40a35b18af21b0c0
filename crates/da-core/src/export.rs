//! CSV and JSON rendering of decoded tables

use crate::error::Result;
use crate::table::{CellValue, TableData, TableRow, ID_COLUMN};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Render a table as CSV text.
///
/// The first line is the column list. Each following line holds one row,
/// with the ID under the `ID` column. Absent values, empty text, zero and
/// NaN render as an empty field. Lines are joined by `\n` without a trailing
/// newline. `name` only labels the log output.
pub fn to_csv(table: &TableData, name: &str) -> String {
    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    lines.push(table.columns.join(","));

    for row in &table.rows {
        let fields: Vec<String> = table
            .columns
            .iter()
            .map(|column| escape_csv(&field_text(row, column)))
            .collect();
        lines.push(fields.join(","));
    }

    debug!(table = name, rows = table.rows.len(), "rendered CSV");
    lines.join("\n")
}

/// Write `<dir>/<name>.csv` and return its path.
///
/// Nested names such as `dlc/feat` create the intermediate directories.
pub fn export_csv<P: AsRef<Path>>(table: &TableData, name: &str, dir: P) -> Result<PathBuf> {
    let path = dir.as_ref().join(format!("{}.csv", name));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, to_csv(table, name))?;
    Ok(path)
}

/// Render a table as pretty-printed JSON
pub fn to_json(table: &TableData) -> Result<String> {
    Ok(serde_json::to_string_pretty(table)?)
}

/// Field text for one cell. Absent values, empty text, zero and NaN all
/// render as an empty field, the ID column included.
fn field_text(row: &TableRow, column: &str) -> String {
    let value = if column == ID_COLUMN {
        CellValue::Number(row.id as f64)
    } else {
        match row.value(column) {
            Some(value) => value.clone(),
            None => return String::new(),
        }
    };

    match value {
        CellValue::Number(n) if n == 0.0 || n.is_nan() => String::new(),
        value => value.to_string(),
    }
}

/// Quote a field containing a comma or a double quote, doubling inner quotes
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
