//! Minimal CSV/TSV reader that fills a [`Table`].

use crate::error::{GridError, Result};
use crate::store::{ColumnKind, GrowthPolicy, Table, TableConfig};

/// Delimiter for parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    /// Pick a delimiter from a file name, defaulting to comma.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".tsv") || lower.ends_with(".tab") {
            Self::Tab
        } else {
            Self::Comma
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Tab => '\t',
        }
    }
}

/// A parsed delimited file.
#[derive(Debug)]
pub struct Import {
    /// Header names when the first line was treated as a header.
    pub headers: Vec<String>,
    pub table: Table,
}

/// Parse delimited bytes into a table, one storage row per non-empty line.
///
/// Column kinds are inferred from the data. With `header`, the first line
/// becomes [`Import::headers`] instead of a row.
pub fn parse_delimited(data: &[u8], delim: Delimiter, header: bool) -> Result<Import> {
    let text = String::from_utf8_lossy(data);
    let sep = delim.as_char();

    let mut lines = text.lines().filter(|l| !l.is_empty());
    let headers = if header {
        lines
            .next()
            .map(|l| split_csv_line(l, sep))
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    let records: Vec<Vec<String>> = lines.map(|l| split_csv_line(l, sep)).collect();

    let column_count = records
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);
    let row_count = u32::try_from(records.len()).map_err(|_| GridError::CapacityExceeded {
        capacity: u32::MAX,
    })?;

    let kinds = (0..column_count)
        .map(|c| {
            ColumnKind::infer(
                records
                    .iter()
                    .map(|r| r.get(c).map_or("", |v| v.trim())),
            )
        })
        .collect();

    let mut table = Table::new(&TableConfig {
        row_capacity: row_count,
        column_count,
        growth: GrowthPolicy::Doubling,
        initial_rows: None,
        kinds,
    })?;

    for (row, record) in (0..row_count).zip(&records) {
        for (col, field) in record.iter().enumerate() {
            table.set_value(row, col, field.trim())?;
        }
    }

    log::debug!("imported {row_count} rows x {column_count} columns");
    Ok(Import { headers, table })
}

/// Split a CSV line respecting quoted fields.
fn split_csv_line(line: &str, sep: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    // Escaped quote
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else if ch == '"' {
            in_quotes = true;
        } else if ch == sep {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}

/// Quote a field for CSV output when needed.
#[must_use]
pub fn escape_field(value: &str, delim: Delimiter) -> String {
    let sep = delim.as_char();
    if value.contains(sep) || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_basic() {
        let data = b"Name,Age,City\nAlice,30,NYC\nBob,25,LA";
        let import = parse_delimited(data, Delimiter::Comma, true).unwrap();
        assert_eq!(import.headers, vec!["Name", "Age", "City"]);
        let table = &import.table;
        assert_eq!(table.occupied_rows(), 2);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.value(0, 0).unwrap(), "Alice");
        assert_eq!(table.column_kind(1).unwrap(), ColumnKind::Number);
        assert_eq!(table.column_kind(2).unwrap(), ColumnKind::Text);
    }

    #[test]
    fn test_parse_tsv_without_header() {
        let data = b"A\tB\n1\t2";
        let import = parse_delimited(data, Delimiter::Tab, false).unwrap();
        assert!(import.headers.is_empty());
        assert_eq!(import.table.occupied_rows(), 2);
        assert_eq!(import.table.value(1, 1).unwrap(), "2");
    }

    #[test]
    fn test_quoted_csv() {
        let data = b"\"Hello, World\",42\n\"She said \"\"hi\"\"\",0";
        let import = parse_delimited(data, Delimiter::Comma, false).unwrap();
        assert_eq!(import.table.value(0, 0).unwrap(), "Hello, World");
        assert_eq!(import.table.value(1, 0).unwrap(), "She said \"hi\"");
    }

    #[test]
    fn test_ragged_rows_pad_with_empty() {
        let data = b"a,b,c\nd";
        let import = parse_delimited(data, Delimiter::Comma, false).unwrap();
        assert_eq!(import.table.column_count(), 3);
        assert_eq!(import.table.value(1, 2).unwrap(), "");
    }

    #[test]
    fn test_empty_csv() {
        let import = parse_delimited(b"", Delimiter::Comma, false).unwrap();
        assert_eq!(import.table.occupied_rows(), 0);
        assert_eq!(import.table.column_count(), 0);
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain", Delimiter::Comma), "plain");
        assert_eq!(escape_field("a,b", Delimiter::Comma), "\"a,b\"");
        assert_eq!(escape_field("say \"x\"", Delimiter::Tab), "\"say \"\"x\"\"\"");
        assert_eq!(Delimiter::from_path("data.TSV"), Delimiter::Tab);
    }
}
