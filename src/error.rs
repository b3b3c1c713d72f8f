//! Structured error types for xlgrid.
//!
//! Every fallible store operation returns [`Result`]. An empty cell is a
//! valid `""` value, never an error.

/// All errors that can occur in the grid store and its persistence boundary.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Row or column address outside the current bounds.
    #[error("{axis} {index} out of range (limit {limit})")]
    OutOfRange {
        axis: Axis,
        index: u64,
        limit: u64,
    },

    /// Append attempted on a full table without a growth policy.
    #[error("row capacity {capacity} exceeded")]
    CapacityExceeded { capacity: u32 },

    /// A non-zero code with no dictionary entry. Indicates corruption.
    #[error("invalid dictionary code {code} in column {column}")]
    InvalidCode { column: usize, code: u32 },

    /// The dictionary ran out of `u32` codes.
    #[error("dictionary code space exhausted in column {column}")]
    CodeSpaceExhausted { column: usize },

    /// Snapshot validation failed; nothing was restored.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Snapshot record could not be encoded or decoded.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The external record store reported a failure.
    #[error("record store: {0}")]
    Store(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which coordinate an [`GridError::OutOfRange`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Physical storage row.
    StorageRow,
    /// Row position in the current display order.
    ViewRow,
    Column,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::StorageRow => "storage row",
            Self::ViewRow => "view row",
            Self::Column => "column",
        })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

impl GridError {
    pub(crate) fn row(row: u32, limit: u32) -> Self {
        Self::OutOfRange {
            axis: Axis::StorageRow,
            index: u64::from(row),
            limit: u64::from(limit),
        }
    }

    pub(crate) fn view_row(row: u32, limit: u32) -> Self {
        Self::OutOfRange {
            axis: Axis::ViewRow,
            index: u64::from(row),
            limit: u64::from(limit),
        }
    }

    pub(crate) fn column(col: usize, limit: usize) -> Self {
        Self::OutOfRange {
            axis: Axis::Column,
            index: col as u64,
            limit: limit as u64,
        }
    }

    /// Stable numeric code for JS callers.
    ///
    /// 1xxx: addressing, 2xxx: store integrity, 3xxx: persistence.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::OutOfRange { .. } => 1001,
            Self::CapacityExceeded { .. } => 1002,
            Self::InvalidCode { .. } => 2001,
            Self::CodeSpaceExhausted { .. } => 2002,
            Self::MalformedSnapshot(_) => 3001,
            Self::Json(_) => 3002,
            Self::Store(_) => 3003,
            Self::Io(_) => 3004,
        }
    }

    /// Whether the in-memory table is still trustworthy after this error.
    ///
    /// Only dictionary corruption is not.
    #[must_use]
    pub fn is_advisory(&self) -> bool {
        !matches!(self, Self::InvalidCode { .. })
    }
}

#[cfg(target_arch = "wasm32")]
impl From<GridError> for wasm_bindgen::JsValue {
    fn from(e: GridError) -> Self {
        wasm_bindgen::JsValue::from_str(&format!("[{}] {e}", e.code()))
    }
}
