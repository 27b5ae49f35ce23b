//! Cleaning stages that run before any aggregation.
//!
//! Each stage takes the table by value and hands it back, so exactly one
//! stage owns it at a time.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::loader::{parse_float, parse_int};
use crate::table::{Column, ColumnData, Table};

pub const TITLE: &str = "Title";
pub const AUTHOR: &str = "Author";
pub const GENRE: &str = "Genre";
pub const PRICE: &str = "Price";
pub const PRICE_RAW: &str = "Price_raw";
pub const RATING: &str = "Rating";
pub const PUBLICATION_YEAR: &str = "Publication Year";
pub const REVIEWS: &str = "Reviews";

/// Source column name to canonical column name.
pub const RENAMES: &[(&str, &str)] = &[
    ("Name", TITLE),
    ("Year", PUBLICATION_YEAR),
    ("User Rating", RATING),
];

/// Row counts around deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DedupeSummary {
    pub original_rows: usize,
    pub deduped_rows: usize,
}

impl DedupeSummary {
    pub fn removed(&self) -> usize {
        self.original_rows - self.deduped_rows
    }
}

/// Drops rows identical to an earlier row across every column.
///
/// The first occurrence survives and relative order is preserved.
#[tracing::instrument(skip_all, fields(rows = table.row_count()))]
pub fn deduplicate(mut table: Table) -> (Table, DedupeSummary) {
    let original_rows = table.row_count();

    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(original_rows);
        (0..original_rows).map(|i| seen.insert(table.row(i))).collect()
    };
    table.retain_rows(&keep);

    let summary = DedupeSummary {
        original_rows,
        deduped_rows: table.row_count(),
    };
    info!(
        original_rows,
        deduped_rows = summary.deduped_rows,
        removed = summary.removed(),
        "Deduplicated rows"
    );
    (table, summary)
}

/// Renames source columns to their canonical names.
///
/// # Errors
///
/// [`PipelineError::Schema`] if a rename target already exists as a column
/// that is not itself being renamed.
pub fn normalize_schema(mut table: Table) -> Result<Table> {
    for (from, to) in RENAMES {
        if !table.has_column(from) {
            continue;
        }
        let target_moves_away = RENAMES.iter().any(|(src, _)| src == to);
        if table.has_column(to) && !target_moves_away {
            return Err(PipelineError::Schema(format!(
                "renaming '{from}' to '{to}' collides with an existing column"
            )));
        }
    }

    for column in table.columns_mut() {
        if let Some((_, to)) = RENAMES.iter().find(|(from, _)| *from == column.name) {
            column.name = (*to).to_string();
        }
    }
    Ok(table)
}

/// A cell whose text could not be read as a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoercionFailure {
    pub column: String,
    pub row: usize,
    pub raw: String,
}

/// What the coercer learned about the data while converting it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoercionReport {
    pub failures: Vec<CoercionFailure>,
    /// Rows whose `Price` is null after coercion, in table order.
    pub invalid_price_rows: Vec<usize>,
}

/// Converts `Price` and `Rating` to numbers, keeping the original prices in
/// `Price_raw`. Unparseable cells become null and are recorded, not raised.
///
/// # Errors
///
/// [`PipelineError::Schema`] when `Price` or `Rating` is missing.
#[tracing::instrument(skip_all)]
pub fn coerce_types(mut table: Table) -> Result<(Table, CoercionReport)> {
    let raw = table.require(PRICE)?.data.clone();
    table.require(RATING)?;
    match table.column_mut(PRICE_RAW) {
        Some(existing) => existing.data = raw,
        None => table.push_column(Column::new(PRICE_RAW, raw))?,
    }

    let mut report = CoercionReport::default();
    for name in [PRICE, RATING] {
        if let Some(column) = table.column_mut(name) {
            coerce_column(column, &mut report.failures);
        }
    }

    let price = table.require(PRICE)?;
    report.invalid_price_rows = price
        .values()
        .enumerate()
        .filter(|(_, v)| v.is_null())
        .map(|(i, _)| i)
        .collect();

    if !report.failures.is_empty() {
        warn!(
            failures = report.failures.len(),
            "Some values could not be read as numbers"
        );
    }
    info!(
        invalid_prices = report.invalid_price_rows.len(),
        "Coerced numeric columns"
    );
    Ok((table, report))
}

fn coerce_column(column: &mut Column, failures: &mut Vec<CoercionFailure>) {
    let ColumnData::Text(cells) = &column.data else {
        return;
    };

    let ints: Option<Vec<i64>> = cells
        .iter()
        .map(|c| c.as_deref().and_then(parse_int))
        .collect();
    if let Some(ints) = ints.filter(|v| !v.is_empty()) {
        column.data = ColumnData::Integer(ints);
        return;
    }

    let mut floats = Vec::with_capacity(cells.len());
    for (row, cell) in cells.iter().enumerate() {
        let parsed = cell.as_deref().and_then(parse_float);
        if let (Some(raw), None) = (cell, parsed) {
            failures.push(CoercionFailure {
                column: column.name.clone(),
                row,
                raw: raw.clone(),
            });
        }
        floats.push(parsed);
    }
    column.data = ColumnData::Numeric(floats);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::read_table;
    use crate::table::{ColumnKind, Value};

    fn table(csv: &str) -> Table {
        read_table(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_identical_rows_collapse() {
        let t = table("Name,Price\nA,1\nB,2\nA,1\n");
        let (t, summary) = deduplicate(t);

        assert_eq!(summary.original_rows, 3);
        assert_eq!(summary.deduped_rows, 2);
        assert_eq!(summary.removed(), 1);
        assert_eq!(t.require("Name").unwrap().get(1), Value::Text("B"));
    }

    #[test]
    fn test_dedup_treats_missing_cells_as_equal() {
        let t = table("Name,Price\nA,\nA,\n");
        let (_, summary) = deduplicate(t);
        assert_eq!(summary.deduped_rows, 1);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let (once, _) = deduplicate(table("a,b\n1,x\n1,x\n2,y\n2,y\n1,x\n"));
        let (twice, summary) = deduplicate(once.clone());

        assert_eq!(once, twice);
        assert_eq!(summary.removed(), 0);
    }

    #[test]
    fn test_dedup_empty_table() {
        let (_, summary) = deduplicate(table("a,b\n"));
        assert_eq!(summary.original_rows, 0);
        assert_eq!(summary.removed(), 0);
    }

    #[test]
    fn test_normalize_renames_known_columns() {
        let t = normalize_schema(table("Name,Author,User Rating,Year,Price,Genre\nA,B,4.5,2019,8,F\n"))
            .unwrap();
        let names: Vec<_> = t.column_names().collect();
        assert_eq!(
            names,
            vec!["Title", "Author", "Rating", "Publication Year", "Price", "Genre"]
        );
    }

    #[test]
    fn test_normalize_rejects_collision() {
        let result = normalize_schema(table("Name,Title\nA,B\n"));
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }

    #[test]
    fn test_coerce_prices() {
        let t = table("Title,Price,Rating\nA,10.5,4\nB,abc,5\nC,,3\n");
        let (t, report) = coerce_types(t).unwrap();
        let price = t.require(PRICE).unwrap();

        assert_eq!(price.get(0), Value::Float(10.5));
        assert_eq!(price.get(1), Value::Null);
        assert_eq!(price.get(2), Value::Null);
        assert_eq!(report.invalid_price_rows, vec![1, 2]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].raw, "abc");

        let raw = t.require(PRICE_RAW).unwrap();
        assert_eq!(raw.get(1), Value::Text("abc"));
        assert_eq!(raw.get(2), Value::Null);
        assert_eq!(t.column_names().last(), Some(PRICE_RAW));
    }

    #[test]
    fn test_coerce_keeps_numeric_columns() {
        let t = table("Title,Price,Rating\nA,8,4.5\nB,12,4.0\n");
        let (t, report) = coerce_types(t).unwrap();

        assert_eq!(t.require(PRICE).unwrap().kind(), ColumnKind::Integer);
        assert_eq!(t.require(RATING).unwrap().kind(), ColumnKind::Numeric);
        assert!(report.invalid_price_rows.is_empty());
    }

    #[test]
    fn test_coerce_requires_price() {
        let result = coerce_types(table("Title,Rating\nA,4\n"));
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }
}
