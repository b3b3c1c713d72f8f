//! Per-column string dictionary.
//!
//! Code `0` is the empty string and is never stored. Codes `1..=N` map to
//! `values[code - 1]`. The dictionary is append-only: a code keeps its
//! meaning for the lifetime of the table, so persisted snapshots and edit
//! history stay valid even after every cell using a value is cleared.

use std::collections::HashMap;

/// Code reserved for the empty cell.
pub const EMPTY_CODE: u32 = 0;

/// Bidirectional string <-> code mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    values: Vec<String>,
    index: HashMap<String, u32>,
}

impl Dictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a dictionary from its ordered values (code `i + 1` for `values[i]`).
    ///
    /// Returns `None` if a value is empty, repeated, or there are more than
    /// `u32::MAX` values.
    pub fn from_values(values: Vec<String>) -> Option<Self> {
        let mut index = HashMap::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            if value.is_empty() {
                return None;
            }
            let code = u32::try_from(i + 1).ok()?;
            if index.insert(value.clone(), code).is_some() {
                return None;
            }
        }
        Some(Self { values, index })
    }

    /// Return the code for `value`, assigning the next unused one if needed.
    ///
    /// The empty string always maps to [`EMPTY_CODE`]. Returns `None` only when
    /// the code space is exhausted.
    pub fn intern(&mut self, value: &str) -> Option<u32> {
        if value.is_empty() {
            return Some(EMPTY_CODE);
        }
        if let Some(&code) = self.index.get(value) {
            return Some(code);
        }
        let code = u32::try_from(self.values.len() + 1).ok()?;
        self.values.push(value.to_string());
        self.index.insert(value.to_string(), code);
        Some(code)
    }

    /// Look up an existing code without interning.
    #[must_use]
    pub fn code_of(&self, value: &str) -> Option<u32> {
        if value.is_empty() {
            return Some(EMPTY_CODE);
        }
        self.index.get(value).copied()
    }

    /// Decode a code. `None` means the code was never assigned.
    #[must_use]
    pub fn decode(&self, code: u32) -> Option<&str> {
        if code == EMPTY_CODE {
            return Some("");
        }
        let idx = usize::try_from(code - 1).ok()?;
        self.values.get(idx).map(String::as_str)
    }

    /// Whether `code` is empty or assigned.
    #[must_use]
    pub fn contains_code(&self, code: u32) -> bool {
        code == EMPTY_CODE || usize::try_from(code).is_ok_and(|c| c <= self.values.len())
    }

    /// Number of assigned (non-empty) values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in code order, starting at code 1.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }
}
