//! Durable table snapshots.
//!
//! A snapshot carries everything needed to rebuild the table except the
//! display order, which is view state and is reset to identity on restore.

use serde::{Deserialize, Serialize};

use super::column::{Column, ColumnKind};
use super::dictionary::Dictionary;
use crate::error::{GridError, Result};

/// Current persisted record format.
pub const RECORD_VERSION: u32 = 1;

/// Self-describing copy of the table contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub row_capacity: u32,
    pub occupied_rows: u32,
    pub columns: Vec<ColumnSnapshot>,
}

/// One column of a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSnapshot {
    pub kind: ColumnKind,
    /// Length must equal the snapshot's `row_capacity`.
    pub codes: Vec<u32>,
    /// Value for code `i` is `dictionary_values[i - 1]`.
    pub dictionary_values: Vec<String>,
}

impl Snapshot {
    /// Check every structural invariant and build the columns.
    ///
    /// Nothing is mutated here, so a failure leaves the caller's table as it was.
    pub(crate) fn validate(&self) -> Result<Vec<Column>> {
        if self.occupied_rows > self.row_capacity {
            return Err(GridError::MalformedSnapshot(format!(
                "occupied rows {} exceed capacity {}",
                self.occupied_rows, self.row_capacity
            )));
        }
        let capacity = self.row_capacity as usize;
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                if col.codes.len() != capacity {
                    return Err(GridError::MalformedSnapshot(format!(
                        "column {idx} has {} codes, expected {capacity}",
                        col.codes.len()
                    )));
                }
                let dictionary = Dictionary::from_values(col.dictionary_values.clone())
                    .ok_or_else(|| {
                        GridError::MalformedSnapshot(format!(
                            "column {idx} dictionary has empty or duplicate values"
                        ))
                    })?;
                if let Some(code) = col.codes.iter().find(|&&c| !dictionary.contains_code(c)) {
                    return Err(GridError::MalformedSnapshot(format!(
                        "column {idx} references missing dictionary code {code}"
                    )));
                }
                Ok(Column {
                    kind: col.kind,
                    codes: col.codes.clone(),
                    dictionary,
                })
            })
            .collect()
    }
}

impl ColumnSnapshot {
    pub(crate) fn of(column: &Column) -> Self {
        Self {
            kind: column.kind,
            codes: column.codes.clone(),
            dictionary_values: column.dictionary.values().to_vec(),
        }
    }
}

/// One persisted record: a snapshot keyed by its table identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub version: u32,
    pub table_id: String,
    pub snapshot: Snapshot,
}

impl PersistedRecord {
    #[must_use]
    pub fn new(table_id: &str, snapshot: Snapshot) -> Self {
        Self {
            version: RECORD_VERSION,
            table_id: table_id.to_string(),
            snapshot,
        }
    }

    /// Encode as JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode JSON bytes, rejecting unknown format versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record: Self = serde_json::from_slice(bytes)?;
        if record.version != RECORD_VERSION {
            return Err(GridError::MalformedSnapshot(format!(
                "unsupported record version {}",
                record.version
            )));
        }
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            row_capacity: 3,
            occupied_rows: 2,
            columns: vec![ColumnSnapshot {
                kind: ColumnKind::Text,
                codes: vec![1, 2, 0],
                dictionary_values: vec!["a".into(), "b".into()],
            }],
        }
    }

    #[test]
    fn test_validate_ok() {
        let cols = snapshot().validate().unwrap();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].dictionary().decode(2), Some("b"));
    }

    #[test]
    fn test_validate_rejects_missing_code() {
        let mut snap = snapshot();
        snap.columns[0].codes[2] = 3;
        assert!(matches!(
            snap.validate(),
            Err(GridError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_validate_rejects_occupied_over_capacity() {
        let mut snap = snapshot();
        snap.occupied_rows = 4;
        assert!(matches!(
            snap.validate(),
            Err(GridError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_record_json_layout() {
        let record = PersistedRecord::new("t1", snapshot());
        let json: serde_json::Value = serde_json::from_slice(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(json["tableId"], "t1");
        assert_eq!(json["snapshot"]["rowCapacity"], 3);
        assert_eq!(json["snapshot"]["columns"][0]["kind"], "text");
        assert_eq!(json["snapshot"]["columns"][0]["dictionaryValues"][1], "b");
    }

    #[test]
    fn test_record_rejects_future_version() {
        let mut record = PersistedRecord::new("t1", snapshot());
        record.version = 99;
        let bytes = serde_json::to_vec(&record).unwrap();
        assert!(matches!(
            PersistedRecord::from_bytes(&bytes),
            Err(GridError::MalformedSnapshot(_))
        ));
    }
}
