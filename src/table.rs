//! In-memory columnar table shared by every pipeline stage.
//!
//! Columns are typed once at load time. After the coercer runs, `Price` and
//! `Rating` are guaranteed to be numeric (integer or nullable float); every
//! other column keeps the type the loader inferred for it.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{PipelineError, Result};

/// Storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Integer-like column with no missing cells.
    Integer,
    /// Nullable floating point column.
    Numeric,
    /// Nullable text column.
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<i64>),
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub(crate) fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Integer(_) => ColumnKind::Integer,
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(_) => ColumnKind::Text,
        }
    }
}

/// A borrowed view of a single cell.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    Null,
    Int(i64),
    Float(f64),
    Text(&'a str),
}

impl<'a> Value<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(i) => Some(i as f64),
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Renders the cell for prose output, using `placeholder` for nulls.
    pub fn display_or(&self, placeholder: &str) -> String {
        match self {
            Value::Null => placeholder.to_string(),
            other => other.to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::Text(_) => 3,
        }
    }
}

fn canonical(f: f64) -> f64 {
    if f == 0.0 { 0.0 } else { f }
}

impl Ord for Value<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value<'_> {}

impl Hash for Value<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Int(i) => i.hash(state),
            Value::Float(f) => canonical(*f).to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

/// CSV field rendering: nulls are empty, floats keep a decimal point.
impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Formats a float as its shortest round-trip repr: `8.0`, `4.25`, `1e+16`, `1.5e-05`.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let repr = format!("{v:?}");
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => repr,
    }
}

/// Formats an optional statistic; undefined values become an empty field.
pub fn format_opt_float(v: Option<f64>) -> String {
    match v {
        Some(v) if !v.is_nan() => format_float(v),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Column {
            name: name.into(),
            data,
        }
    }

    pub fn text(name: &str, cells: &[Option<&str>]) -> Self {
        Column::new(
            name,
            ColumnData::Text(cells.iter().map(|c| c.map(str::to_string)).collect()),
        )
    }

    pub fn numeric(name: &str, cells: &[Option<f64>]) -> Self {
        Column::new(name, ColumnData::Numeric(cells.to_vec()))
    }

    pub fn integer(name: &str, cells: &[i64]) -> Self {
        Column::new(name, ColumnData::Integer(cells.to_vec()))
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn get(&self, row: usize) -> Value<'_> {
        match &self.data {
            ColumnData::Integer(v) => Value::Int(v[row]),
            ColumnData::Numeric(v) => v[row].map_or(Value::Null, Value::Float),
            ColumnData::Text(v) => v[row].as_deref().map_or(Value::Null, Value::Text),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = Value<'_>> {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn null_count(&self) -> usize {
        match &self.data {
            ColumnData::Integer(_) => 0,
            ColumnData::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    fn retain(&mut self, keep: &[bool]) {
        fn filter<T>(cells: &mut Vec<T>, keep: &[bool]) {
            let mut idx = 0;
            cells.retain(|_| {
                let k = keep[idx];
                idx += 1;
                k
            });
        }
        match &mut self.data {
            ColumnData::Integer(v) => filter(v, keep),
            ColumnData::Numeric(v) => filter(v, keep),
            ColumnData::Text(v) => filter(v, keep),
        }
    }
}

/// Ordered set of equally long, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map_or(0, Column::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(PipelineError::Schema(format!(
                "column '{}' has {} rows, expected {}",
                bad.name,
                bad.len(),
                rows
            )));
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(PipelineError::Schema(format!(
                    "duplicate column '{}'",
                    col.name
                )));
            }
        }
        Ok(Table { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Looks up a column the pipeline cannot run without.
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| PipelineError::Schema(format!("missing required column '{name}'")))
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Appends a column at the end of the schema.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(PipelineError::Schema(format!(
                "column '{}' already exists",
                column.name
            )));
        }
        if !self.columns.is_empty() && column.len() != self.rows {
            return Err(PipelineError::Schema(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.len(),
                self.rows
            )));
        }
        self.rows = column.len();
        self.columns.push(column);
        Ok(())
    }

    /// All cells of one row, in column order.
    pub fn row(&self, row: usize) -> Vec<Value<'_>> {
        self.columns.iter().map(|c| c.get(row)).collect()
    }

    /// Keeps the rows whose `keep` flag is set, preserving their order.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.rows);
        for col in &mut self.columns {
            col.retain(keep);
        }
        self.rows = keep.iter().filter(|k| **k).count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float_matches_repr() {
        assert_eq!(format_float(8.0), "8.0");
        assert_eq!(format_float(4.25), "4.25");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(-3.0), "-3.0");
    }

    #[test]
    fn test_format_opt_float_blank_for_missing() {
        assert_eq!(format_opt_float(None), "");
        assert_eq!(format_opt_float(Some(f64::NAN)), "");
        assert_eq!(format_opt_float(Some(2.5)), "2.5");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int(2019).to_string(), "2019");
        assert_eq!(Value::Float(12.0).to_string(), "12.0");
        assert_eq!(Value::Text("Fiction").to_string(), "Fiction");
        assert_eq!(Value::Null.display_or("N/A"), "N/A");
    }

    #[test]
    fn test_value_equality_ignores_zero_sign() {
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert!(Value::Text("A") < Value::Text("B"));
    }

    #[test]
    fn test_from_columns_rejects_ragged() {
        let result = Table::from_columns(vec![
            Column::integer("a", &[1, 2]),
            Column::integer("b", &[1]),
        ]);
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }

    #[test]
    fn test_retain_rows() {
        let mut table = Table::from_columns(vec![
            Column::integer("a", &[1, 2, 3]),
            Column::text("b", &[Some("x"), None, Some("z")]),
        ])
        .unwrap();
        table.retain_rows(&[true, false, true]);

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(1), vec![Value::Int(3), Value::Text("z")]);
        assert_eq!(table.require("b").unwrap().null_count(), 0);
    }
}
