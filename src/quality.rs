//! Plain-text data quality summary.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::cleaning::{AUTHOR, CoercionReport, DedupeSummary, PRICE_RAW, TITLE};
use crate::error::{PipelineError, Result};
use crate::table::Table;

/// Shown in place of a title or price that is itself missing.
pub const PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidPrice {
    pub title: String,
    pub price_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub original_rows: usize,
    pub deduped_rows: usize,
    pub duplicates_removed: usize,
    /// Missing cells per column, in schema order, counted after coercion.
    pub missing_values: Vec<(String, usize)>,
    pub unique_authors: usize,
    pub unique_titles: usize,
    pub invalid_prices: Vec<InvalidPrice>,
}

impl QualityReport {
    pub fn build(table: &Table, dedupe: &DedupeSummary, coercion: &CoercionReport) -> Self {
        let field = |name: &str, row: usize| {
            table
                .column(name)
                .map_or_else(|| PLACEHOLDER.to_string(), |c| c.get(row).display_or(PLACEHOLDER))
        };

        QualityReport {
            original_rows: dedupe.original_rows,
            deduped_rows: dedupe.deduped_rows,
            duplicates_removed: dedupe.removed(),
            missing_values: table
                .columns()
                .iter()
                .map(|c| (c.name.clone(), c.null_count()))
                .collect(),
            unique_authors: distinct(table, AUTHOR),
            unique_titles: distinct(table, TITLE),
            invalid_prices: coercion
                .invalid_price_rows
                .iter()
                .map(|&row| InvalidPrice {
                    title: field(TITLE, row),
                    price_value: field(PRICE_RAW, row),
                })
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("Data Quality Report\n");
        out.push_str("====================\n");
        out.push_str(&format!("Total rows (original): {}\n", self.original_rows));
        out.push_str(&format!("Total rows (after dedupe): {}\n", self.deduped_rows));
        out.push_str(&format!("Duplicates removed: {}\n\n", self.duplicates_removed));

        out.push_str("Missing values per column:\n");
        for (column, count) in &self.missing_values {
            out.push_str(&format!("- {column}: {count}\n"));
        }

        out.push_str("\nUnique counts:\n");
        out.push_str(&format!("- Authors: {}\n", self.unique_authors));
        out.push_str(&format!("- Titles: {}\n", self.unique_titles));

        out.push_str("\nNon-numeric prices (if any):\n");
        if self.invalid_prices.is_empty() {
            out.push_str("- None\n");
        }
        for invalid in &self.invalid_prices {
            out.push_str(&format!(
                "- Title: {} | Price value: {}\n",
                invalid.title, invalid.price_value
            ));
        }
        out
    }
}

fn distinct(table: &Table, name: &str) -> usize {
    table.column(name).map_or(0, |c| {
        c.values()
            .filter(|v| !v.is_null())
            .collect::<HashSet<_>>()
            .len()
    })
}

/// Writes the rendered report to `path`, replacing any existing file.
pub fn write_quality_report(path: &Path, report: &QualityReport) -> Result<()> {
    fs::write(path, report.render()).map_err(|e| PipelineError::output(path, e))?;
    info!(
        path = %path.display(),
        invalid_prices = report.invalid_prices.len(),
        "Wrote data quality report"
    );
    Ok(())
}
