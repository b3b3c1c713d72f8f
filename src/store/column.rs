//! Column storage: a dense code array plus its dictionary and value kind.

use serde::{Deserialize, Serialize};

use super::dictionary::{Dictionary, EMPTY_CODE};

/// Declared value kind of a column.
///
/// Cells always hold their canonical string form. Only `Number` changes how
/// values compare when sorting; the other kinds sort by bytes and serve
/// import inference and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Text,
    /// Decimal numbers (`f64` syntax).
    Number,
    /// ISO dates, `YYYY-MM-DD` with an optional time suffix.
    Date,
    /// `true`/`false`/`1`/`0`, case-insensitive.
    Boolean,
}

impl ColumnKind {
    /// Infer the narrowest kind that parses every non-empty value.
    ///
    /// Columns with no values are [`ColumnKind::Text`].
    pub fn infer<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut number = true;
        let mut date = true;
        let mut boolean = true;
        let mut seen = false;
        for value in values.into_iter().filter(|v| !v.is_empty()) {
            seen = true;
            number &= parse_number(value).is_some();
            date &= parse_date(value).is_some();
            boolean &= parse_bool(value).is_some();
            if !(number || date || boolean) {
                return Self::Text;
            }
        }
        if !seen {
            Self::Text
        } else if number {
            Self::Number
        } else if date {
            Self::Date
        } else if boolean {
            Self::Boolean
        } else {
            Self::Text
        }
    }
}

impl std::str::FromStr for ColumnKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(Self::Text),
            "number" | "numeric" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "boolean" | "bool" => Ok(Self::Boolean),
            other => Err(format!("unknown column kind '{other}'")),
        }
    }
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("true") || v == "1" {
        Some(true)
    } else if v.eq_ignore_ascii_case("false") || v == "0" {
        Some(false)
    } else {
        None
    }
}

/// Parse `YYYY-MM-DD` with an optional `T`/space separated suffix.
///
/// Returns the date triple and the (possibly empty) suffix.
pub(crate) fn parse_date(value: &str) -> Option<((i32, u32, u32), &str)> {
    let v = value.trim();
    let (date, rest) = match v.find(['T', ' ']) {
        Some(pos) => (v.get(..pos)?, v.get(pos + 1..)?),
        None => (v, ""),
    };
    let mut parts = date.splitn(3, '-');
    let year_str = parts.next()?;
    let month_str = parts.next()?;
    let day_str = parts.next()?;
    if year_str.len() != 4 || month_str.len() != 2 || day_str.len() != 2 {
        return None;
    }
    let year: i32 = year_str.parse().ok()?;
    let month: u32 = month_str.parse().ok()?;
    let day: u32 = day_str.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(((year, month, day), rest))
}

/// One column of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub(crate) kind: ColumnKind,
    pub(crate) codes: Vec<u32>,
    pub(crate) dictionary: Dictionary,
}

impl Column {
    pub(crate) fn new(kind: ColumnKind, row_capacity: u32) -> Self {
        Self {
            kind,
            codes: vec![EMPTY_CODE; row_capacity as usize],
            dictionary: Dictionary::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    #[must_use]
    pub fn codes(&self) -> &[u32] {
        &self.codes
    }

    #[must_use]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Code stored at `row`, or `None` past capacity.
    #[must_use]
    pub fn code_at(&self, row: u32) -> Option<u32> {
        self.codes.get(row as usize).copied()
    }

    /// Count of non-empty cells within the first `rows` storage rows.
    #[must_use]
    pub fn filled(&self, rows: u32) -> usize {
        self.codes
            .iter()
            .take(rows as usize)
            .filter(|&&c| c != EMPTY_CODE)
            .count()
    }

    /// Reallocate to `new_capacity`, keeping existing codes.
    pub(crate) fn grow(&mut self, new_capacity: u32) {
        self.codes.resize(new_capacity as usize, EMPTY_CODE);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&["1", "2.5", "-3"], ColumnKind::Number ; "numbers")]
    #[test_case(&["2024-01-02", "1999-12-31T08:00"], ColumnKind::Date ; "dates")]
    #[test_case(&["true", "FALSE"], ColumnKind::Boolean ; "booleans")]
    #[test_case(&["1", "0"], ColumnKind::Number ; "zero one prefers number")]
    #[test_case(&["1", "x"], ColumnKind::Text ; "mixed")]
    #[test_case(&["", ""], ColumnKind::Text ; "all empty")]
    fn test_infer(values: &[&str], expected: ColumnKind) {
        assert_eq!(ColumnKind::infer(values.iter().copied()), expected);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-09"), Some(((2024, 3, 9), "")));
        assert_eq!(parse_date("2024-03-09T10:00"), Some(((2024, 3, 9), "10:00")));
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("24-03-09"), None);
        assert_eq!(parse_date("hello"), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Number".parse::<ColumnKind>(), Ok(ColumnKind::Number));
        assert!("blob".parse::<ColumnKind>().is_err());
    }

    #[test]
    fn test_grow_keeps_codes() {
        let mut col = Column::new(ColumnKind::Text, 2);
        col.codes[1] = 7;
        col.grow(4);
        assert_eq!(col.codes(), &[0, 7, 0, 0]);
    }
}
