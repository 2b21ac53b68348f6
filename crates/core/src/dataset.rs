//! Column-ordered tabular values.
//!
//! Scraped tables arrive with differing column sets per year and team, so a
//! `Dataset` carries its own column names and tolerates alignment on append.
//! The operations here are the small slice of dataframe behavior the load
//! pipeline needs: select, rename, constant columns, concatenation,
//! de-duplication on a column subset, inner joins, and null filtering.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Errors produced by in-memory dataset operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A row was pushed with a different arity than the dataset's columns.
    #[error("row has {got} values but dataset has {expected} columns")]
    RowArity {
        /// Number of columns in the dataset
        expected: usize,
        /// Number of values in the rejected row
        got: usize,
    },

    /// A referenced column does not exist in the dataset.
    #[error("no such column: {0}")]
    UnknownColumn(String),

    /// A column with this name already exists.
    #[error("column already exists: {0}")]
    DuplicateColumn(String),
}

/// A single scalar cell.
///
/// Serialized untagged, so JSON snapshots read naturally:
/// `null`, `12`, `6.5`, `"Downingtown, PA"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing / unknown value
    Null,
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
}

impl Value {
    /// True for `Null` and for empty/whitespace-only text, which scraped
    /// tables use interchangeably for "no data".
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer content, if this is an integer cell.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    // Equality-key rendering used for joins and de-duplication. Floats get a
    // canonical formatting so 1.0 and 1.00 collide.
    fn key_repr(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{f:?}"),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// An ordered set of named columns plus rows of scalar cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create an empty dataset with the given column names.
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Dataset {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Column names, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the dataset holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows, in insertion order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Whether a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Position of a column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `(row, column)`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Append a row. The row must match the dataset's column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), DatasetError> {
        if row.len() != self.columns.len() {
            return Err(DatasetError::RowArity {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// New dataset holding only the named columns, in the requested order.
    pub fn select(&self, columns: &[&str]) -> Result<Dataset, DatasetError> {
        let indices = columns
            .iter()
            .map(|c| {
                self.column_index(c)
                    .ok_or_else(|| DatasetError::UnknownColumn((*c).to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dataset {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Like [`select`](Self::select), but silently skips columns the dataset
    /// does not have. Scraped rosters are column-heterogeneous, so callers
    /// narrowing to a schema use this.
    pub fn select_present(&self, columns: &[&str]) -> Dataset {
        let present: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| self.has_column(c))
            .collect();
        self.select(&present).expect("filtered columns exist")
    }

    /// Rename a column in place.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), DatasetError> {
        if self.has_column(to) {
            return Err(DatasetError::DuplicateColumn(to.to_string()));
        }
        let idx = self
            .column_index(from)
            .ok_or_else(|| DatasetError::UnknownColumn(from.to_string()))?;
        self.columns[idx] = to.to_string();
        Ok(())
    }

    /// Append a constant-valued column to every row.
    pub fn with_column(mut self, name: &str, value: Value) -> Result<Dataset, DatasetError> {
        if self.has_column(name) {
            return Err(DatasetError::DuplicateColumn(name.to_string()));
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
        Ok(self)
    }

    /// Append another dataset's rows, aligning by column name. Columns
    /// missing on either side are filled with `Null`; new columns from
    /// `other` are appended after the existing ones.
    pub fn append(&mut self, other: &Dataset) {
        for col in &other.columns {
            if !self.has_column(col) {
                self.columns.push(col.clone());
                for row in &mut self.rows {
                    row.push(Value::Null);
                }
            }
        }
        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|c| other.column_index(c))
            .collect();
        for src in &other.rows {
            let row = mapping
                .iter()
                .map(|idx| idx.map(|i| src[i].clone()).unwrap_or(Value::Null))
                .collect();
            self.rows.push(row);
        }
    }

    /// Drop rows that repeat an earlier row on the named columns, keeping
    /// first occurrences. Returns the number of rows dropped.
    pub fn dedup_on(&mut self, columns: &[&str]) -> Result<usize, DatasetError> {
        let indices = columns
            .iter()
            .map(|c| {
                self.column_index(c)
                    .ok_or_else(|| DatasetError::UnknownColumn((*c).to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        let before = self.rows.len();
        self.rows
            .retain(|row| seen.insert(row_key(row, &indices)));
        Ok(before - self.rows.len())
    }

    /// Like [`dedup_on`](Self::dedup_on), but skips columns the dataset does
    /// not have. Missing columns simply don't participate in the key.
    pub fn dedup_on_present(&mut self, columns: &[&str]) -> usize {
        let present: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| self.has_column(c))
            .collect();
        if present.is_empty() {
            return 0;
        }
        self.dedup_on(&present).expect("filtered columns exist")
    }

    /// Drop rows where every one of the named columns is missing
    /// ([`Value::is_missing`]). Returns the number of rows dropped.
    pub fn drop_rows_all_missing(&mut self, columns: &[&str]) -> Result<usize, DatasetError> {
        let indices = columns
            .iter()
            .map(|c| {
                self.column_index(c)
                    .ok_or_else(|| DatasetError::UnknownColumn((*c).to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let before = self.rows.len();
        self.rows
            .retain(|row| indices.iter().any(|&i| !row[i].is_missing()));
        Ok(before - self.rows.len())
    }

    /// Remove rows by index. Indices refer to the current row ordering;
    /// out-of-range entries are ignored.
    pub fn drop_rows(&mut self, indices: &[usize]) {
        let doomed: HashSet<usize> = indices.iter().copied().collect();
        let mut i = 0;
        self.rows.retain(|_| {
            let keep = !doomed.contains(&i);
            i += 1;
            keep
        });
    }

    /// Inner equality join on the named columns. The result carries this
    /// dataset's columns followed by the other's remaining columns (join
    /// columns and name collisions are taken from the left side). Rows
    /// multiply on multiple matches.
    pub fn inner_join(&self, other: &Dataset, on: &[&str]) -> Result<Dataset, DatasetError> {
        let left_idx = on
            .iter()
            .map(|c| {
                self.column_index(c)
                    .ok_or_else(|| DatasetError::UnknownColumn((*c).to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let right_idx = on
            .iter()
            .map(|c| {
                other
                    .column_index(c)
                    .ok_or_else(|| DatasetError::UnknownColumn((*c).to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Columns pulled over from the right side: not a join key, not
        // already present on the left.
        let carried: Vec<usize> = other
            .columns
            .iter()
            .enumerate()
            .filter(|(i, name)| !right_idx.contains(i) && !self.has_column(name))
            .map(|(i, _)| i)
            .collect();

        let mut index: std::collections::HashMap<String, Vec<usize>> =
            std::collections::HashMap::new();
        for (i, row) in other.rows.iter().enumerate() {
            index
                .entry(row_key(row, &right_idx))
                .or_default()
                .push(i);
        }

        let mut columns = self.columns.clone();
        columns.extend(carried.iter().map(|&i| other.columns[i].clone()));
        let mut joined = Dataset {
            columns,
            rows: Vec::new(),
        };

        for row in &self.rows {
            let Some(matches) = index.get(&row_key(row, &left_idx)) else {
                continue;
            };
            for &m in matches {
                let mut out = row.clone();
                out.extend(carried.iter().map(|&i| other.rows[m][i].clone()));
                joined.rows.push(out);
            }
        }
        Ok(joined)
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Result<Vec<&Value>, DatasetError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| DatasetError::UnknownColumn(column.to_string()))?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }
}

fn row_key(row: &[Value], indices: &[usize]) -> String {
    let mut key = String::new();
    for &i in indices {
        key.push_str(&row[i].key_repr());
        key.push('\u{1f}');
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut ds = Dataset::new(vec!["team_name", "wins"]);
        ds.push_row(vec!["Alabama".into(), Value::Int(11)]).unwrap();
        ds.push_row(vec!["Auburn".into(), Value::Int(8)]).unwrap();
        ds
    }

    #[test]
    fn push_row_rejects_wrong_arity() {
        let mut ds = sample();
        let err = ds.push_row(vec![Value::Int(1)]).unwrap_err();
        assert!(matches!(err, DatasetError::RowArity { expected: 2, got: 1 }));
    }

    #[test]
    fn select_reorders_columns() {
        let ds = sample().select(&["wins", "team_name"]).unwrap();
        assert_eq!(ds.columns(), &["wins", "team_name"]);
        assert_eq!(ds.value(0, "team_name"), Some(&Value::Text("Alabama".into())));
    }

    #[test]
    fn select_present_skips_unknown() {
        let ds = sample().select_present(&["team_name", "nope"]);
        assert_eq!(ds.columns(), &["team_name"]);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn append_aligns_heterogeneous_columns() {
        let mut left = sample();
        let mut right = Dataset::new(vec!["team_name", "losses"]);
        right
            .push_row(vec!["Georgia".into(), Value::Int(2)])
            .unwrap();
        left.append(&right);

        assert_eq!(left.columns(), &["team_name", "wins", "losses"]);
        assert_eq!(left.len(), 3);
        assert_eq!(left.value(0, "losses"), Some(&Value::Null));
        assert_eq!(left.value(2, "wins"), Some(&Value::Null));
        assert_eq!(left.value(2, "losses"), Some(&Value::Int(2)));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut ds = Dataset::new(vec!["name", "town"]);
        ds.push_row(vec!["A".into(), "X".into()]).unwrap();
        ds.push_row(vec!["A".into(), "X".into()]).unwrap();
        ds.push_row(vec!["A".into(), "Y".into()]).unwrap();
        let dropped = ds.dedup_on(&["name", "town"]).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn drop_rows_all_missing_spares_partial_rows() {
        let mut ds = Dataset::new(vec!["name", "yds", "td"]);
        ds.push_row(vec!["A".into(), Value::Null, Value::Null]).unwrap();
        ds.push_row(vec!["B".into(), Value::Int(120), Value::Null])
            .unwrap();
        ds.push_row(vec!["C".into(), Value::Text("".into()), Value::Null])
            .unwrap();
        let dropped = ds.drop_rows_all_missing(&["yds", "td"]).unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(ds.value(0, "name"), Some(&Value::Text("B".into())));
    }

    #[test]
    fn inner_join_resolves_ids() {
        let mut lookup = Dataset::new(vec!["team_id", "team_name"]);
        lookup
            .push_row(vec![Value::Int(1), "Alabama".into()])
            .unwrap();
        lookup
            .push_row(vec![Value::Int(2), "Auburn".into()])
            .unwrap();

        let joined = sample().inner_join(&lookup, &["team_name"]).unwrap();
        assert_eq!(joined.columns(), &["team_name", "wins", "team_id"]);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.value(0, "team_id"), Some(&Value::Int(1)));
    }

    #[test]
    fn inner_join_drops_unmatched_rows() {
        let mut lookup = Dataset::new(vec!["team_id", "team_name"]);
        lookup
            .push_row(vec![Value::Int(1), "Alabama".into()])
            .unwrap();
        let joined = sample().inner_join(&lookup, &["team_name"]).unwrap();
        assert_eq!(joined.len(), 1);
    }

    #[test]
    fn json_round_trip_preserves_nulls() {
        let mut ds = Dataset::new(vec!["name", "weight"]);
        ds.push_row(vec!["A".into(), Value::Null]).unwrap();
        ds.push_row(vec!["B".into(), Value::Int(210)]).unwrap();
        let json = serde_json::to_string(&ds).unwrap();
        let back: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ds);
    }
}
