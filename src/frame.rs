//! Columnar event-metadata frame attached to each model batch.
//!
//! A [`MetaFrame`] is the tabular slice of recent user events that travels
//! with a trained model through the pipeline. The publisher reads it in two
//! places: the provenance extractor derives the training window from the
//! configured timestamp column, and the signature inferencer runs a one-row
//! slice through the model to learn its input contract. Both must observe
//! the same columns, so the frame is shared, never rebuilt per consumer.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// A single cell value in a [`MetaFrame`] column.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
  /// A missing value. Ignored by `min`/`max`/`count`.
  Null,
  /// A boolean value.
  Bool(bool),
  /// A 64-bit signed integer.
  Int(i64),
  /// A 64-bit float.
  Float(f64),
  /// A UTF-8 string.
  Str(String),
  /// A UTC timestamp.
  Timestamp(DateTime<Utc>),
}

impl Scalar {
  /// Returns true if this cell holds no value.
  pub fn is_null(&self) -> bool {
    matches!(self, Scalar::Null)
  }

  /// Orders two scalars of comparable kinds.
  ///
  /// Ints and floats compare numerically with each other; all other kinds
  /// only compare within their own variant. Incomparable pairs (and nulls)
  /// yield `None`.
  pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
    match (self, other) {
      (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
      (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
      (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b),
      (Scalar::Int(a), Scalar::Float(b)) => (*a as f64).partial_cmp(b),
      (Scalar::Float(a), Scalar::Int(b)) => a.partial_cmp(&(*b as f64)),
      (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
      (Scalar::Timestamp(a), Scalar::Timestamp(b)) => Some(a.cmp(b)),
      _ => None,
    }
  }

  /// Returns the timestamp value, if this scalar holds one.
  pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
    match self {
      Scalar::Timestamp(ts) => Some(*ts),
      _ => None,
    }
  }
}

impl fmt::Display for Scalar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Scalar::Null => write!(f, "null"),
      Scalar::Bool(v) => write!(f, "{}", v),
      Scalar::Int(v) => write!(f, "{}", v),
      Scalar::Float(v) => write!(f, "{}", v),
      Scalar::Str(v) => write!(f, "{}", v),
      Scalar::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
    }
  }
}

/// The column-level type used when inferring a model signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
  /// Boolean column.
  Boolean,
  /// 64-bit integer column.
  Long,
  /// 64-bit float column.
  Double,
  /// String column.
  String,
  /// UTC timestamp column.
  Datetime,
}

/// A named column of scalar values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
  name: String,
  values: Vec<Scalar>,
}

impl Column {
  /// Creates a column from a name and its values.
  pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
    Self {
      name: name.into(),
      values,
    }
  }

  /// The column name.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The raw cell values, nulls included.
  pub fn values(&self) -> &[Scalar] {
    &self.values
  }

  /// The number of non-null cells.
  pub fn count(&self) -> u64 {
    self.values.iter().filter(|v| !v.is_null()).count() as u64
  }

  /// The smallest non-null value, if the column has any.
  pub fn min(&self) -> Option<&Scalar> {
    self.fold_extreme(Ordering::Less)
  }

  /// The largest non-null value, if the column has any.
  pub fn max(&self) -> Option<&Scalar> {
    self.fold_extreme(Ordering::Greater)
  }

  fn fold_extreme(&self, keep: Ordering) -> Option<&Scalar> {
    let mut best: Option<&Scalar> = None;
    for value in self.values.iter().filter(|v| !v.is_null()) {
      best = match best {
        None => Some(value),
        Some(current) => match value.compare(current) {
          Some(ord) if ord == keep => Some(value),
          _ => Some(current),
        },
      };
    }
    best
  }

  /// Infers the column-level [`DataType`] from the non-null cells.
  ///
  /// Mixed int/float columns widen to `Double`; any other mix, or an
  /// all-null column, falls back to `String`.
  pub fn infer_type(&self) -> DataType {
    let mut inferred: Option<DataType> = None;
    for value in self.values.iter().filter(|v| !v.is_null()) {
      let kind = match value {
        Scalar::Bool(_) => DataType::Boolean,
        Scalar::Int(_) => DataType::Long,
        Scalar::Float(_) => DataType::Double,
        Scalar::Str(_) => DataType::String,
        Scalar::Timestamp(_) => DataType::Datetime,
        Scalar::Null => unreachable!(),
      };
      inferred = match inferred {
        None => Some(kind),
        Some(current) if current == kind => Some(current),
        Some(DataType::Long) if kind == DataType::Double => Some(DataType::Double),
        Some(DataType::Double) if kind == DataType::Long => Some(DataType::Double),
        Some(_) => return DataType::String,
      };
    }
    inferred.unwrap_or(DataType::String)
  }
}

/// Error raised when constructing a malformed frame.
#[derive(Debug, Error)]
pub enum FrameError {
  /// Columns of differing lengths were supplied.
  #[error("column '{column}' has {actual} rows, expected {expected}")]
  LengthMismatch {
    /// Name of the offending column.
    column: String,
    /// Row count expected from the first column.
    expected: usize,
    /// Row count actually supplied.
    actual: usize,
  },
  /// Two columns share the same name.
  #[error("duplicate column '{0}'")]
  DuplicateColumn(String),
}

/// A columnar table of user event metadata.
///
/// All columns hold the same number of rows; construction enforces this.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaFrame {
  columns: Vec<Column>,
  rows: usize,
}

impl MetaFrame {
  /// Builds a frame from columns, validating row counts and name uniqueness.
  pub fn new(columns: Vec<Column>) -> Result<Self, FrameError> {
    let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
    for column in &columns {
      if column.values.len() != rows {
        return Err(FrameError::LengthMismatch {
          column: column.name.clone(),
          expected: rows,
          actual: column.values.len(),
        });
      }
      if columns.iter().filter(|c| c.name == column.name).count() > 1 {
        return Err(FrameError::DuplicateColumn(column.name.clone()));
      }
    }
    Ok(Self { columns, rows })
  }

  /// An empty frame with no columns and no rows.
  pub fn empty() -> Self {
    Self {
      columns: Vec::new(),
      rows: 0,
    }
  }

  /// The number of rows.
  pub fn num_rows(&self) -> usize {
    self.rows
  }

  /// The column names, in declaration order.
  pub fn column_names(&self) -> impl Iterator<Item = &str> {
    self.columns.iter().map(|c| c.name())
  }

  /// Looks up a column by name.
  pub fn column(&self, name: &str) -> Option<&Column> {
    self.columns.iter().find(|c| c.name == name)
  }

  /// All columns, in declaration order.
  pub fn columns(&self) -> &[Column] {
    &self.columns
  }

  /// Returns a new frame containing the first `n` rows of every column.
  pub fn head(&self, n: usize) -> MetaFrame {
    let take = n.min(self.rows);
    let columns = self
      .columns
      .iter()
      .map(|c| Column::new(c.name.clone(), c.values[..take].to_vec()))
      .collect();
    MetaFrame {
      columns,
      rows: take,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn ts(secs: i64) -> Scalar {
    Scalar::Timestamp(Utc.timestamp_opt(secs, 0).unwrap())
  }

  #[test]
  fn test_min_max_skip_nulls() {
    let col = Column::new("ts", vec![ts(30), Scalar::Null, ts(10), ts(20)]);
    assert_eq!(col.min(), Some(&ts(10)));
    assert_eq!(col.max(), Some(&ts(30)));
    assert_eq!(col.count(), 3);
  }

  #[test]
  fn test_all_null_column_has_no_extremes() {
    let col = Column::new("empty", vec![Scalar::Null, Scalar::Null]);
    assert_eq!(col.min(), None);
    assert_eq!(col.max(), None);
    assert_eq!(col.count(), 0);
  }

  #[test]
  fn test_mixed_numeric_widens_to_double() {
    let col = Column::new("n", vec![Scalar::Int(1), Scalar::Float(2.5)]);
    assert_eq!(col.infer_type(), DataType::Double);
    assert_eq!(col.min(), Some(&Scalar::Int(1)));
  }

  #[test]
  fn test_incompatible_mix_falls_back_to_string() {
    let col = Column::new("m", vec![Scalar::Int(1), Scalar::Str("a".into())]);
    assert_eq!(col.infer_type(), DataType::String);
  }

  #[test]
  fn test_frame_rejects_ragged_columns() {
    let result = MetaFrame::new(vec![
      Column::new("a", vec![Scalar::Int(1), Scalar::Int(2)]),
      Column::new("b", vec![Scalar::Int(1)]),
    ]);
    assert!(matches!(result, Err(FrameError::LengthMismatch { .. })));
  }

  #[test]
  fn test_frame_rejects_duplicate_names() {
    let result = MetaFrame::new(vec![
      Column::new("a", vec![Scalar::Int(1)]),
      Column::new("a", vec![Scalar::Int(2)]),
    ]);
    assert!(matches!(result, Err(FrameError::DuplicateColumn(_))));
  }

  #[test]
  fn test_head_slices_every_column() {
    let frame = MetaFrame::new(vec![
      Column::new("a", vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]),
      Column::new("b", vec![ts(1), ts(2), ts(3)]),
    ])
    .unwrap();
    let head = frame.head(1);
    assert_eq!(head.num_rows(), 1);
    assert_eq!(head.column("a").unwrap().values(), &[Scalar::Int(1)]);
    assert_eq!(head.column("b").unwrap().values(), &[ts(1)]);
  }
}
