//! Values flowing through the engine: scalars, slice coordinates, measure
//! values and per-step columns.
//!
//! `RowBatch`/`Column` hold raw fact rows for leaf sources. `SliceColumn` is
//! what every plan step produces: one value per output slice.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric view of the value; `None` for nulls, booleans and strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::I64(v) => Some(*v as f64),
            Scalar::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Total order used by min/max kernels.
    ///
    /// Nulls sort first, numbers compare across integer/float, NaN sorts
    /// after every other number, mixed kinds order by kind.
    pub fn total_cmp(&self, other: &Scalar) -> Ordering {
        use Scalar::*;

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Bool(x), Bool(y)) => x.cmp(y),
            (I64(x), I64(y)) => x.cmp(y),
            (Str(x), Str(y)) => x.cmp(y),
            (I64(_) | F64(_), I64(_) | F64(_)) => {
                // Both arms are numeric here.
                let (x, y) = (self.as_f64().unwrap_or(f64::NAN), other.as_f64().unwrap_or(f64::NAN));
                x.total_cmp(&y)
            }
            _ => kind_order(self).cmp(&kind_order(other)),
        }
    }
}

fn kind_order(s: &Scalar) -> u8 {
    match s {
        Scalar::Null => 0,
        Scalar::Bool(_) => 1,
        Scalar::I64(_) | Scalar::F64(_) => 2,
        Scalar::Str(_) => 3,
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A group-by coordinate. Unlike `Scalar` it is `Eq + Hash + Ord` so it can
/// key slices and live inside filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<&Scalar> for Coordinate {
    fn from(s: &Scalar) -> Self {
        match s {
            Scalar::Null => Coordinate::Null,
            Scalar::Bool(b) => Coordinate::Bool(*b),
            Scalar::I64(v) => Coordinate::Int(*v),
            // Floats are not valid hash keys; they group by their rendering.
            Scalar::F64(v) => Coordinate::Str(v.to_string()),
            Scalar::Str(s) => Coordinate::Str(s.clone()),
        }
    }
}

impl From<&str> for Coordinate {
    fn from(s: &str) -> Self {
        Coordinate::Str(s.to_string())
    }
}

impl From<i64> for Coordinate {
    fn from(v: i64) -> Self {
        Coordinate::Int(v)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Null => write!(f, "null"),
            Coordinate::Bool(b) => write!(f, "{b}"),
            Coordinate::Int(v) => write!(f, "{v}"),
            Coordinate::Str(s) => write!(f, "{s}"),
        }
    }
}

/// One output row: the coordinates of the group-by columns.
///
/// The grand total (no group-by) is the empty slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slice(BTreeMap<String, Coordinate>);

impl Slice {
    pub fn grand_total() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Coordinate>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn insert(&mut self, column: impl Into<String>, coordinate: Coordinate) {
        self.0.insert(column.into(), coordinate);
    }

    pub fn get(&self, column: &str) -> Option<&Coordinate> {
        self.0.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Coordinate)> {
        self.0.iter()
    }

    pub fn is_grand_total(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}}")
    }
}

/// Intermediate accumulator that must not reach callers unwrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "carrier", rename_all = "snake_case")]
pub enum Carrier {
    /// Running average kept as `(sum, count)` so partial results can merge.
    Avg { sum: f64, count: u64 },
}

impl Carrier {
    /// Externally representable value of the accumulator.
    pub fn value(&self) -> Scalar {
        match self {
            Carrier::Avg { count: 0, .. } => Scalar::Null,
            Carrier::Avg { sum, count } => Scalar::F64(sum / *count as f64),
        }
    }

    pub fn merge(&self, other: &Carrier) -> Carrier {
        match (self, other) {
            (Carrier::Avg { sum: s1, count: c1 }, Carrier::Avg { sum: s2, count: c2 }) => {
                Carrier::Avg {
                    sum: s1 + s2,
                    count: c1 + c2,
                }
            }
        }
    }
}

/// Value held by a step column for one slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasureValue {
    Scalar(Scalar),
    Carrier(Carrier),
    /// Failure captured as data (see `QueryOption::ExceptionsAsMeasureValue`).
    Error { error: String },
}

impl MeasureValue {
    pub fn null() -> Self {
        MeasureValue::Scalar(Scalar::Null)
    }

    /// Scalar view: carriers collapse to their value, errors to null.
    pub fn to_scalar(&self) -> Scalar {
        match self {
            MeasureValue::Scalar(s) => s.clone(),
            MeasureValue::Carrier(c) => c.value(),
            MeasureValue::Error { .. } => Scalar::Null,
        }
    }

    pub fn is_carrier(&self) -> bool {
        matches!(self, MeasureValue::Carrier(_))
    }

    /// Replace a carrier by its representable value; other values pass through.
    pub fn unwrap_carrier(self) -> Self {
        match self {
            MeasureValue::Carrier(c) => MeasureValue::Scalar(c.value()),
            other => other,
        }
    }
}

impl From<Scalar> for MeasureValue {
    fn from(s: Scalar) -> Self {
        MeasureValue::Scalar(s)
    }
}

impl fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureValue::Scalar(s) => write!(f, "{s}"),
            MeasureValue::Carrier(c) => write!(f, "{c:?}"),
            MeasureValue::Error { error } => write!(f, "#ERROR({error})"),
        }
    }
}

/// Output of one plan step: slice → value, ordered for deterministic output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceColumn {
    values: BTreeMap<Slice, MeasureValue>,
}

impl SliceColumn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slice: Slice, value: MeasureValue) {
        self.values.insert(slice, value);
    }

    pub fn get(&self, slice: &Slice) -> Option<&MeasureValue> {
        self.values.get(slice)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Slice, &MeasureValue)> {
        self.values.iter()
    }

    pub fn slices(&self) -> impl Iterator<Item = &Slice> {
        self.values.keys()
    }
}

impl FromIterator<(Slice, MeasureValue)> for SliceColumn {
    fn from_iter<T: IntoIterator<Item = (Slice, MeasureValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Raw fact column. Leaf sources aggregate these into `SliceColumn`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Columnar batch of fact rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<Column>,
}

impl RowBatch {
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value at `(row, column)`; `None` when the column is unknown.
    pub fn value(&self, row: usize, column: &str) -> Option<&Scalar> {
        let idx = self.column_index(column)?;
        self.columns[idx].values.get(row)
    }

    /// Build a batch from row-major records. Missing cells become nulls.
    pub fn from_rows(column_names: &[&str], rows: Vec<Vec<Scalar>>) -> Result<Self, String> {
        let mut columns: Vec<Column> = column_names
            .iter()
            .map(|n| Column {
                name: n.to_string(),
                values: Vec::with_capacity(rows.len()),
            })
            .collect();
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() > columns.len() {
                return Err(format!(
                    "row {} has {} cells but only {} columns are declared",
                    row_idx,
                    row.len(),
                    columns.len()
                ));
            }
            let width = row.len();
            for (col, value) in columns.iter_mut().zip(row) {
                col.values.push(value);
            }
            for col in columns.iter_mut().skip(width) {
                col.values.push(Scalar::Null);
            }
        }
        Ok(Self { columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_across_kinds() {
        assert_eq!(Scalar::I64(3).total_cmp(&Scalar::F64(2.5)), Ordering::Greater);
        assert_eq!(Scalar::Null.total_cmp(&Scalar::I64(-10)), Ordering::Less);
        assert_eq!(Scalar::F64(f64::NAN).total_cmp(&Scalar::F64(1.0)), Ordering::Greater);
    }

    #[test]
    fn avg_carrier_merges_and_unwraps() {
        let a = Carrier::Avg { sum: 10.0, count: 2 };
        let b = Carrier::Avg { sum: 2.0, count: 2 };
        assert_eq!(a.merge(&b).value(), Scalar::F64(3.0));
        assert_eq!(Carrier::Avg { sum: 0.0, count: 0 }.value(), Scalar::Null);

        let wrapped = MeasureValue::Carrier(a);
        assert!(wrapped.is_carrier());
        assert_eq!(wrapped.unwrap_carrier(), MeasureValue::Scalar(Scalar::F64(5.0)));
    }

    #[test]
    fn from_rows_pads_short_rows() {
        let batch = RowBatch::from_rows(
            &["k", "v"],
            vec![vec![Scalar::Str("a".into()), Scalar::I64(1)], vec![Scalar::Str("b".into())]],
        )
        .unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.value(1, "v"), Some(&Scalar::Null));
        assert!(RowBatch::from_rows(&["k"], vec![vec![Scalar::Null, Scalar::Null]]).is_err());
    }

    #[test]
    fn slice_display_is_sorted() {
        let s = Slice::from_pairs([("b", Coordinate::Int(2)), ("a", Coordinate::from("x"))]);
        assert_eq!(s.to_string(), "{a=x, b=2}");
        assert!(Slice::grand_total().is_grand_total());
    }
}
