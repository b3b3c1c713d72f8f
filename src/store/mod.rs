//! The columnar table store.
//!
//! A [`Table`] is a fixed-capacity grid of dictionary-encoded string cells.
//! Two coordinate spaces are kept apart:
//! - *storage rows* are physical slots (`value`, `set_value`, `add_row`),
//! - *view rows* are positions in the current display order (`display_value`).
//!
//! Sorting only permutes the display order; storage never moves.

mod column;
mod dictionary;
mod order;
mod snapshot;
mod sort;

pub use column::{Column, ColumnKind};
pub use dictionary::{Dictionary, EMPTY_CODE};
pub use order::{is_permutation, DisplayOrder};
pub use snapshot::{ColumnSnapshot, PersistedRecord, Snapshot, RECORD_VERSION};
pub use sort::{compare_values, SortAction, SortOutcome, SortStatus};

use serde::{Deserialize, Serialize};

use crate::clock::Stopwatch;
use crate::error::{GridError, Result};

/// What `add_row` does when the table is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthPolicy {
    /// Fail with [`GridError::CapacityExceeded`].
    Fixed,
    /// Double the capacity and reallocate every column.
    #[default]
    Doubling,
}

/// Construction parameters for a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfig {
    pub row_capacity: u32,
    pub column_count: usize,
    pub growth: GrowthPolicy,
    /// Rows visible at creation. `None` means the full capacity.
    pub initial_rows: Option<u32>,
    /// Per-column kinds; missing entries default to text.
    pub kinds: Vec<ColumnKind>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_capacity: 100,
            column_count: 10,
            growth: GrowthPolicy::Doubling,
            initial_rows: None,
            kinds: Vec::new(),
        }
    }
}

/// Dictionary-encoded grid with a reversible display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_capacity: u32,
    occupied_rows: u32,
    order: DisplayOrder,
    sort: SortStatus,
    growth: GrowthPolicy,
}

impl Table {
    /// Create an empty table.
    pub fn new(config: &TableConfig) -> Result<Self> {
        let occupied_rows = config.initial_rows.unwrap_or(config.row_capacity);
        if occupied_rows > config.row_capacity {
            return Err(GridError::CapacityExceeded {
                capacity: config.row_capacity,
            });
        }
        let columns = (0..config.column_count)
            .map(|c| {
                let kind = config.kinds.get(c).copied().unwrap_or_default();
                Column::new(kind, config.row_capacity)
            })
            .collect();
        Ok(Self {
            columns,
            row_capacity: config.row_capacity,
            occupied_rows,
            order: DisplayOrder::identity(occupied_rows),
            sort: SortStatus::default(),
            growth: config.growth,
        })
    }

    /// Fully occupied `rows x cols` text table that grows by doubling.
    #[must_use]
    pub fn with_shape(rows: u32, cols: usize) -> Self {
        let columns = (0..cols)
            .map(|_| Column::new(ColumnKind::Text, rows))
            .collect();
        Self {
            columns,
            row_capacity: rows,
            occupied_rows: rows,
            order: DisplayOrder::identity(rows),
            sort: SortStatus::default(),
            growth: GrowthPolicy::Doubling,
        }
    }

    #[must_use]
    pub fn row_capacity(&self) -> u32 {
        self.row_capacity
    }

    #[must_use]
    pub fn occupied_rows(&self) -> u32 {
        self.occupied_rows
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn growth(&self) -> GrowthPolicy {
        self.growth
    }

    pub fn set_growth(&mut self, growth: GrowthPolicy) {
        self.growth = growth;
    }

    #[must_use]
    pub fn column(&self, col: usize) -> Option<&Column> {
        self.columns.get(col)
    }

    fn column_checked(&self, col: usize) -> Result<&Column> {
        self.columns
            .get(col)
            .ok_or_else(|| GridError::column(col, self.columns.len()))
    }

    pub fn column_kind(&self, col: usize) -> Result<ColumnKind> {
        Ok(self.column_checked(col)?.kind)
    }

    /// Change how a column compares when sorted. Stored values are untouched.
    pub fn set_column_kind(&mut self, col: usize, kind: ColumnKind) -> Result<()> {
        let limit = self.columns.len();
        let column = self
            .columns
            .get_mut(col)
            .ok_or_else(|| GridError::column(col, limit))?;
        column.kind = kind;
        Ok(())
    }

    // ---- Storage-row access ----

    /// Write `value` at storage `row` (any row below capacity).
    ///
    /// The empty string clears the cell. Rewriting the same value leaves
    /// storage unchanged.
    pub fn set_value(&mut self, row: u32, col: usize, value: &str) -> Result<()> {
        if row >= self.row_capacity {
            return Err(GridError::row(row, self.row_capacity));
        }
        let capacity = self.row_capacity;
        let limit = self.columns.len();
        let column = self
            .columns
            .get_mut(col)
            .ok_or_else(|| GridError::column(col, limit))?;
        let code = column
            .dictionary
            .intern(value)
            .ok_or(GridError::CodeSpaceExhausted { column: col })?;
        let slot = column
            .codes
            .get_mut(row as usize)
            .ok_or_else(|| GridError::row(row, capacity))?;
        *slot = code;
        Ok(())
    }

    /// Read the value at storage `row`. Never-written cells read as `""`.
    pub fn value(&self, row: u32, col: usize) -> Result<&str> {
        let column = self.column_checked(col)?;
        let code = column
            .code_at(row)
            .ok_or_else(|| GridError::row(row, self.row_capacity))?;
        column
            .dictionary
            .decode(code)
            .ok_or(GridError::InvalidCode { column: col, code })
    }

    /// Raw dictionary code at storage `row`.
    pub fn code(&self, row: u32, col: usize) -> Result<u32> {
        self.column_checked(col)?
            .code_at(row)
            .ok_or_else(|| GridError::row(row, self.row_capacity))
    }

    // ---- View-row access ----

    /// Storage row shown at `view_row`.
    pub fn storage_row(&self, view_row: u32) -> Result<u32> {
        self.order
            .storage_row(view_row)
            .ok_or_else(|| GridError::view_row(view_row, self.occupied_rows))
    }

    /// Current view position of a storage row, if it is occupied.
    #[must_use]
    pub fn view_row_of(&self, storage_row: u32) -> Option<u32> {
        self.order.view_row_of(storage_row)
    }

    /// Read the value shown at `view_row` in the current display order.
    pub fn display_value(&self, view_row: u32, col: usize) -> Result<&str> {
        let row = self.storage_row(view_row)?;
        self.value(row, col)
    }

    /// A full view row, decoded.
    pub fn display_row(&self, view_row: u32) -> Result<Vec<&str>> {
        let row = self.storage_row(view_row)?;
        (0..self.columns.len())
            .map(|col| self.value(row, col))
            .collect()
    }

    #[must_use]
    pub fn display_order(&self) -> &DisplayOrder {
        &self.order
    }

    // ---- Growth ----

    /// Append a row and return its storage index.
    ///
    /// The new row goes to the tail of the current view even when a sort is
    /// active. Growth is the only place where column arrays change length.
    pub fn add_row(&mut self) -> Result<u32> {
        if self.occupied_rows == self.row_capacity {
            self.grow()?;
        }
        let row = self.occupied_rows;
        self.order.push(row);
        self.occupied_rows += 1;
        Ok(row)
    }

    fn grow(&mut self) -> Result<()> {
        let capacity = self.row_capacity;
        if self.growth == GrowthPolicy::Fixed {
            log::warn!("add_row rejected: table full at {capacity} rows");
            return Err(GridError::CapacityExceeded { capacity });
        }
        let new_capacity = capacity
            .checked_mul(2)
            .ok_or(GridError::CapacityExceeded { capacity })?
            .max(1);
        for column in &mut self.columns {
            column.grow(new_capacity);
        }
        self.row_capacity = new_capacity;
        log::debug!("grew table capacity {capacity} -> {new_capacity}");
        Ok(())
    }

    // ---- Sorting ----

    /// Stable sort of the display order by `col`.
    ///
    /// An unknown column is rejected without touching the current order.
    pub fn sort_by_column(&mut self, col: usize, ascending: bool) -> Result<SortOutcome> {
        let Some(column) = self.columns.get(col) else {
            log::warn!(
                "sort rejected: column {col} out of range ({} columns)",
                self.columns.len()
            );
            return Err(GridError::column(col, self.columns.len()));
        };
        let watch = Stopwatch::start();
        let rows = sort::sorted_order(self.order.as_slice(), column, ascending);
        self.order.replace(rows);
        self.sort = SortStatus {
            column: Some(col),
            ascending: Some(ascending),
        };
        let elapsed = watch.elapsed();
        log::debug!(
            "sorted {} rows by column {col} ({}) in {elapsed:?}",
            self.occupied_rows,
            if ascending { "asc" } else { "desc" }
        );
        Ok(SortOutcome {
            rows_affected: self.occupied_rows,
            elapsed,
        })
    }

    /// Back to storage order; clears the sort status.
    pub fn reset_display_order(&mut self) {
        self.order.reset(self.occupied_rows);
        self.sort = SortStatus::default();
    }

    /// Last applied sort. Edits after a sort do not re-sort.
    #[must_use]
    pub fn sort_status(&self) -> SortStatus {
        self.sort
    }

    /// Apply the next step of the header-click cycle for `col`.
    pub fn toggle_sort(&mut self, col: usize) -> Result<SortAction> {
        let action = SortAction::next(self.sort, col);
        match action {
            SortAction::Sort { column, ascending } => {
                self.sort_by_column(column, ascending)?;
            }
            SortAction::Reset => self.reset_display_order(),
        }
        Ok(action)
    }

    // ---- Persistence ----

    /// Copy of the durable contents (display order excluded).
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            row_capacity: self.row_capacity,
            occupied_rows: self.occupied_rows,
            columns: self.columns.iter().map(ColumnSnapshot::of).collect(),
        }
    }

    /// Replace the whole table with `snapshot`.
    ///
    /// Validation runs first; on error the table is unchanged. On success the
    /// display order is identity and the sort status is cleared.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        let columns = snapshot.validate()?;
        self.columns = columns;
        self.row_capacity = snapshot.row_capacity;
        self.occupied_rows = snapshot.occupied_rows;
        self.reset_display_order();
        log::debug!(
            "restored table: {} columns, {}/{} rows",
            self.columns.len(),
            self.occupied_rows,
            self.row_capacity
        );
        Ok(())
    }

    /// Build a table directly from a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot, growth: GrowthPolicy) -> Result<Self> {
        let mut table = Self::with_shape(0, 0);
        table.growth = growth;
        table.restore(snapshot)?;
        Ok(table)
    }

    /// Check every invariant, decoding each occupied cell.
    ///
    /// Meant for tests and after restores from untrusted stores.
    pub fn verify(&self) -> Result<()> {
        if !is_permutation(self.order.as_slice()) || self.order.len() != self.occupied_rows as usize
        {
            return Err(GridError::MalformedSnapshot(
                "display order is not a permutation of occupied rows".into(),
            ));
        }
        for (col, column) in self.columns.iter().enumerate() {
            if column.codes.len() != self.row_capacity as usize {
                return Err(GridError::MalformedSnapshot(format!(
                    "column {col} length differs from capacity"
                )));
            }
            if let Some(&code) = column
                .codes
                .iter()
                .find(|&&c| !column.dictionary.contains_code(c))
            {
                return Err(GridError::InvalidCode { column: col, code });
            }
        }
        Ok(())
    }
}
