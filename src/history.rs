//! Edit action log.
//!
//! Entries hold raw strings in storage coordinates, never dictionary codes or
//! view rows, so they survive sorting and restores.

use std::collections::VecDeque;

/// Default number of entries kept before the oldest is dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// One applied cell edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEntry {
    pub row: u32,
    pub col: usize,
    pub old: String,
    pub new: String,
}

impl EditEntry {
    /// The edit that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            row: self.row,
            col: self.col,
            old: self.new.clone(),
            new: self.old.clone(),
        }
    }
}

/// Bounded undo/redo log.
#[derive(Debug, Clone)]
pub struct EditLog {
    entries: VecDeque<EditEntry>,
    /// Number of entries currently applied; `entries[cursor..]` is redoable.
    cursor: usize,
    limit: usize,
}

impl Default for EditLog {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl EditLog {
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record an applied edit, discarding anything that could be redone.
    pub fn record(&mut self, entry: EditEntry) {
        self.entries.truncate(self.cursor);
        self.entries.push_back(entry);
        if self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len();
    }

    /// The edit `undo` would return, without moving the cursor.
    #[must_use]
    pub fn peek_undo(&self) -> Option<EditEntry> {
        let idx = self.cursor.checked_sub(1)?;
        self.entries.get(idx).map(EditEntry::inverse)
    }

    /// The edit `redo` would return, without moving the cursor.
    #[must_use]
    pub fn peek_redo(&self) -> Option<EditEntry> {
        self.entries.get(self.cursor).cloned()
    }

    /// Step back. Returns the edit to apply (already inverted).
    pub fn undo(&mut self) -> Option<EditEntry> {
        let idx = self.cursor.checked_sub(1)?;
        let entry = self.entries.get(idx)?.inverse();
        self.cursor = idx;
        Some(entry)
    }

    /// Step forward. Returns the edit to re-apply.
    pub fn redo(&mut self) -> Option<EditEntry> {
        let entry = self.entries.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(entry)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
