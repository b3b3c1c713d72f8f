//! Sort engine over the display order.
//!
//! Ordering policy:
//! - Number columns compare parsed values. Values that do not parse come
//!   after all numbers (ordered by bytes), then empty cells.
//! - Every other kind, dates and booleans included, compares the decoded
//!   string by bytes (codepoint order), never by locale.
//! - Empty cells are last in both directions; `ascending = false` only
//!   reverses order inside a tier.
//! - The sort is stable against the current display order, so ties keep the
//!   relative order they had on screen.

use std::cmp::Ordering;
use std::time::Duration;

use serde::Serialize;

use super::column::{parse_number, Column, ColumnKind};
use super::dictionary::EMPTY_CODE;

/// Comparable form of one dictionary value.
#[derive(Debug, Clone, PartialEq)]
enum SortKey<'a> {
    Number(f64),
    Bytes(&'a str),
    /// Number-column value that did not parse.
    Unparsed(&'a str),
    Empty,
}

impl SortKey<'_> {
    fn tier(&self) -> u8 {
        match self {
            Self::Empty => 2,
            Self::Unparsed(_) => 1,
            _ => 0,
        }
    }
}

fn key_for(kind: ColumnKind, value: &str) -> SortKey<'_> {
    if value.is_empty() {
        return SortKey::Empty;
    }
    match kind {
        ColumnKind::Number => parse_number(value).map_or(SortKey::Unparsed(value), SortKey::Number),
        ColumnKind::Text | ColumnKind::Date | ColumnKind::Boolean => SortKey::Bytes(value),
    }
}

fn compare_within_tier(a: &SortKey<'_>, b: &SortKey<'_>) -> Ordering {
    match (a, b) {
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Bytes(x), SortKey::Bytes(y)) | (SortKey::Unparsed(x), SortKey::Unparsed(y)) => {
            x.as_bytes().cmp(y.as_bytes())
        }
        _ => Ordering::Equal,
    }
}

fn compare_keys(a: &SortKey<'_>, b: &SortKey<'_>, ascending: bool) -> Ordering {
    a.tier().cmp(&b.tier()).then_with(|| {
        let ord = compare_within_tier(a, b);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    })
}

/// Compare two raw cell values the way a column of `kind` would sort them.
#[must_use]
pub fn compare_values(kind: ColumnKind, a: &str, b: &str, ascending: bool) -> Ordering {
    compare_keys(&key_for(kind, a), &key_for(kind, b), ascending)
}

/// Stable sort of `order` (storage rows) by the values of `column`.
///
/// Keys are built once per dictionary code, not once per row.
pub(crate) fn sorted_order(order: &[u32], column: &Column, ascending: bool) -> Vec<u32> {
    let mut keys = Vec::with_capacity(column.dictionary.len() + 1);
    keys.push(SortKey::Empty);
    keys.extend(
        column
            .dictionary
            .values()
            .iter()
            .map(|v| key_for(column.kind, v)),
    );

    let mut rows = order.to_vec();
    rows.sort_by(|&a, &b| {
        compare_keys(
            key_at(&keys, column, a),
            key_at(&keys, column, b),
            ascending,
        )
    });
    rows
}

fn key_at<'k, 'a>(keys: &'k [SortKey<'a>], column: &Column, row: u32) -> &'k SortKey<'a> {
    let code = column.code_at(row).unwrap_or(EMPTY_CODE);
    keys.get(code as usize).unwrap_or(&SortKey::Empty)
}

/// Last applied sort, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortStatus {
    pub column: Option<usize>,
    pub ascending: Option<bool>,
}

impl SortStatus {
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.column.is_some()
    }
}

/// Result of a completed sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOutcome {
    pub rows_affected: u32,
    pub elapsed: Duration,
}

/// What a header click on a column should do next.
///
/// Cycles ascending -> descending -> unsorted for the same column; any other
/// column starts again at ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortAction {
    Sort { column: usize, ascending: bool },
    Reset,
}

impl SortAction {
    #[must_use]
    pub fn next(status: SortStatus, clicked: usize) -> Self {
        match (status.column, status.ascending) {
            (Some(col), Some(true)) if col == clicked => Self::Sort {
                column: clicked,
                ascending: false,
            },
            (Some(col), Some(false)) if col == clicked => Self::Reset,
            _ => Self::Sort {
                column: clicked,
                ascending: true,
            },
        }
    }
}
