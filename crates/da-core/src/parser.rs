//! Decoder for 2DA V2.0 table text
//!
//! Layout of a 2DA file:
//!
//! ```text
//! 2DA V2.0
//!
//!    LABEL       NAME
//! 0  "Foo"       "A foo item"
//! 1  ****        "Deleted row"
//! ```
//!
//! The header names every column except the implicit ID column. Each data
//! line starts with its integer ID. Decoding never fails: bad rows are
//! skipped and odd values are kept as text.

use crate::config::ColumnRoles;
use crate::resolver::StringResolver;
use crate::table::{CellValue, TableData, TableRow};
use tracing::{debug, trace};

/// Optional first line of a 2DA file
pub const FORMAT_MARKER: &str = "2DA V2.0";

/// Placeholder for "no value"; as the second token it marks a deleted row
pub const EMPTY_PLACEHOLDER: &str = "****";

/// Outcome of decoding, with the number of data lines that were dropped
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeReport {
    pub table: TableData,
    pub skipped_rows: usize,
}

/// Decode 2DA text into a table
pub fn decode(text: &str, roles: &ColumnRoles, resolver: &StringResolver) -> TableData {
    decode_with_report(text, roles, resolver).table
}

/// Decode 2DA text, also reporting how many rows were skipped
pub fn decode_with_report(
    text: &str,
    roles: &ColumnRoles,
    resolver: &StringResolver,
) -> DecodeReport {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && *line != FORMAT_MARKER);

    let Some((_, header_line)) = lines.next() else {
        return DecodeReport {
            table: TableData::empty(),
            skipped_rows: 0,
        };
    };

    let header: Vec<String> = header_line
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    let mut skipped_rows = 0;

    for (line_no, line) in lines {
        match decode_row(line, &header, roles, resolver) {
            Ok(row) => rows.push(row),
            Err(reason) => {
                trace!(line = line_no, reason, "skipping row");
                skipped_rows += 1;
            }
        }
    }

    if rows.is_empty() {
        debug!(skipped = skipped_rows, "2DA table has no data rows");
        return DecodeReport {
            table: TableData::empty(),
            skipped_rows,
        };
    }

    debug!(
        columns = header.len(),
        rows = rows.len(),
        skipped = skipped_rows,
        "decoded 2DA table"
    );

    DecodeReport {
        table: TableData::assemble(header, rows),
        skipped_rows,
    }
}

fn decode_row(
    line: &str,
    header: &[String],
    roles: &ColumnRoles,
    resolver: &StringResolver,
) -> std::result::Result<TableRow, &'static str> {
    let tokens = tokenize(line);

    let first = tokens.first().ok_or("no tokens")?;
    if !is_integer(first) {
        return Err("invalid row id");
    }
    let id = first.parse::<i64>().map_err(|_| "row id out of range")?;

    if tokens
        .get(1)
        .is_some_and(|t| strip_quotes(t) == EMPTY_PLACEHOLDER)
    {
        return Err("deleted row");
    }

    let mut row = TableRow::new(id);
    for (column, token) in header.iter().zip(tokens.iter().skip(1)) {
        row.insert(column.clone(), decode_value(token, column, roles, resolver));
    }
    Ok(row)
}

/// Decode a single token destined for `column`
fn decode_value(
    token: &str,
    column: &str,
    roles: &ColumnRoles,
    resolver: &StringResolver,
) -> CellValue {
    let value = strip_quotes(token);

    if value == EMPTY_PLACEHOLDER {
        return CellValue::Text(String::new());
    }

    if roles.is_reference(column) && is_digits(value) {
        return CellValue::Text(resolver.resolve(value));
    }

    if is_numeric(value) {
        if let Ok(n) = value.parse::<f64>() {
            return CellValue::Number(n);
        }
    }

    CellValue::Text(value.to_string())
}

/// Split a data line into tokens.
///
/// Whitespace separates tokens except inside a double-quoted span. Quotes
/// are kept in the token; empty tokens are never produced.
pub fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut quoted = false;

    for (i, ch) in line.char_indices() {
        if ch == '"' {
            quoted = !quoted;
        } else if !quoted && is_separator(ch) {
            if let Some(s) = start.take() {
                tokens.push(&line[s..i]);
            }
            continue;
        }
        start.get_or_insert(i);
    }

    if let Some(s) = start {
        tokens.push(&line[s..]);
    }
    tokens
}

/// Remove one matching pair of surrounding double quotes
pub fn strip_quotes(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}

/// Spaces separate tokens; tabs are accepted as well, which is wider than
/// the format strictly requires but keeps tab-aligned files readable.
fn is_separator(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `-?\d+`
fn is_integer(s: &str) -> bool {
    is_digits(s.strip_prefix('-').unwrap_or(s))
}

/// `-?\d+(\.\d+)?`
fn is_numeric(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    match unsigned.split_once('.') {
        Some((whole, frac)) => is_digits(whole) && is_digits(frac),
        None => is_digits(unsigned),
    }
}
