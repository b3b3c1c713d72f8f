//! Display-order index: view row -> storage row.
//!
//! Always a permutation of `0..len`. Only sorting, resets, and appends change it.

/// Permutation of storage rows in current view order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayOrder {
    rows: Vec<u32>,
}

impl DisplayOrder {
    /// Identity order over `len` rows.
    #[must_use]
    pub fn identity(len: u32) -> Self {
        Self {
            rows: (0..len).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Storage row shown at `view_row`.
    #[must_use]
    pub fn storage_row(&self, view_row: u32) -> Option<u32> {
        self.rows.get(view_row as usize).copied()
    }

    /// View position of `storage_row`. Linear scan.
    #[must_use]
    pub fn view_row_of(&self, storage_row: u32) -> Option<u32> {
        self.rows
            .iter()
            .position(|&r| r == storage_row)
            .and_then(|p| u32::try_from(p).ok())
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.rows
            .iter()
            .enumerate()
            .all(|(i, &r)| r as usize == i)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.rows
    }

    /// Append a newly added storage row at the tail of the view.
    pub(crate) fn push(&mut self, storage_row: u32) {
        self.rows.push(storage_row);
    }

    pub(crate) fn reset(&mut self, len: u32) {
        self.rows.clear();
        self.rows.extend(0..len);
    }

    /// Replace the order. Caller guarantees `rows` is a permutation of `0..len`.
    pub(crate) fn replace(&mut self, rows: Vec<u32>) {
        debug_assert!(is_permutation(&rows));
        self.rows = rows;
    }
}

/// Whether `rows` holds each value of `0..rows.len()` exactly once.
#[must_use]
pub fn is_permutation(rows: &[u32]) -> bool {
    let mut seen = vec![false; rows.len()];
    rows.iter().all(|&r| match seen.get_mut(r as usize) {
        Some(slot) if !*slot => {
            *slot = true;
            true
        }
        _ => false,
    })
}
