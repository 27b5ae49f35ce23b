//! Report persistence.
//!
//! Every aggregation is written to its own CSV file with a fixed name.
//! Also carries the debug and JSON log helpers used for console output.

use std::fmt::Debug;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::{
    Aggregations, GroupMeans, PriceStats, RatingStats, RowSlice, ValueCounts,
};
use crate::error::{PipelineError, Result};
use crate::table::{Table, format_opt_float};

pub const TOP_AUTHORS_FILE: &str = "top_authors.csv";
pub const AVG_RATING_FILE: &str = "avg_rating_by_genre.csv";
pub const GENRE_COUNTS_FILE: &str = "genre_counts.csv";
pub const PRICE_STATS_FILE: &str = "price_stats_by_genre.csv";
pub const RATING_STATS_FILE: &str = "rating_stats_by_genre.csv";
pub const TOP_EXPENSIVE_FILE: &str = "top_expensive_books.csv";
pub const TOP_RATED_FILE: &str = "top_rated_books.csv";
pub const QUALITY_REPORT_FILE: &str = "data_quality_report.txt";
pub const CHART_FILE: &str = "avg_rating_by_genre.png";

/// Authors listed in `top_authors.csv`.
pub const TOP_AUTHORS: usize = 10;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl Debug) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Logs a frequency table one entry per line.
pub fn log_counts(counts: &ValueCounts<'_>) {
    for row in &counts.rows {
        info!(column = %counts.column, key = %row.key, count = row.count, "Value count");
    }
}

/// Logs group means one entry per line.
pub fn log_group_means(means: &GroupMeans<'_>) {
    for row in &means.rows {
        info!(
            group = %row.key,
            mean = %format_opt_float(row.mean),
            "{} by {}",
            means.value_column,
            means.key_column
        );
    }
}

struct ReportWriter {
    path: PathBuf,
    inner: Writer<File>,
}

impl ReportWriter {
    fn create(path: &Path) -> Result<Self> {
        let inner = WriterBuilder::new()
            .from_path(path)
            .map_err(|e| PipelineError::output(path, e))?;
        Ok(ReportWriter {
            path: path.to_path_buf(),
            inner,
        })
    }

    fn record<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.inner
            .write_record(fields)
            .map_err(|e| PipelineError::output(&self.path, e))
    }

    fn finish(mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| PipelineError::output(&self.path, e))?;
        debug!(path = %self.path.display(), "Wrote report");
        Ok(())
    }
}

/// Writes the first `limit` entries of a frequency table as `<column>,count`.
pub fn write_counts(path: &Path, counts: &ValueCounts<'_>, limit: Option<usize>) -> Result<()> {
    let mut w = ReportWriter::create(path)?;
    w.record([counts.column.as_str(), "count"])?;
    let take = limit.unwrap_or(counts.rows.len());
    for row in counts.rows.iter().take(take) {
        w.record([row.key.to_string(), row.count.to_string()])?;
    }
    w.finish()
}

pub fn write_group_means(path: &Path, means: &GroupMeans<'_>) -> Result<()> {
    let mut w = ReportWriter::create(path)?;
    w.record([means.key_column.as_str(), means.value_column.as_str()])?;
    for row in &means.rows {
        w.record([row.key.to_string(), format_opt_float(row.mean)])?;
    }
    w.finish()
}

pub fn write_price_stats(path: &Path, key_column: &str, stats: &[PriceStats<'_>]) -> Result<()> {
    let mut w = ReportWriter::create(path)?;
    w.record([key_column, "min", "median", "mean", "max"])?;
    for s in stats {
        w.record([
            s.genre.to_string(),
            s.min.to_string(),
            format_opt_float(s.median),
            format_opt_float(s.mean),
            s.max.to_string(),
        ])?;
    }
    w.finish()
}

pub fn write_rating_stats(path: &Path, key_column: &str, stats: &[RatingStats<'_>]) -> Result<()> {
    let mut w = ReportWriter::create(path)?;
    w.record([key_column, "count", "mean", "std"])?;
    for s in stats {
        w.record([
            s.genre.to_string(),
            s.count.to_string(),
            format_opt_float(s.mean),
            format_opt_float(s.std),
        ])?;
    }
    w.finish()
}

/// Writes the projected rows of a slice with a header and no index column.
pub fn write_rows(path: &Path, table: &Table, slice: &RowSlice) -> Result<()> {
    let mut w = ReportWriter::create(path)?;
    w.record(&slice.columns)?;
    for record in slice.records(table) {
        w.record(record.iter().map(ToString::to_string))?;
    }
    w.finish()
}

/// Writes every CSV report into `out_dir` and returns the paths written, in order.
#[tracing::instrument(skip_all, fields(out_dir = %out_dir.display()))]
pub fn write_reports(out_dir: &Path, table: &Table, aggs: &Aggregations<'_>) -> Result<Vec<PathBuf>> {
    let genre = aggs.genre_counts.column.as_str();
    let reports: [(&str, &dyn Fn(&Path) -> Result<()>); 7] = [
        (TOP_AUTHORS_FILE, &|p: &Path| write_counts(p, &aggs.author_counts, Some(TOP_AUTHORS))),
        (AVG_RATING_FILE, &|p: &Path| write_group_means(p, &aggs.avg_rating_by_genre)),
        (GENRE_COUNTS_FILE, &|p: &Path| write_counts(p, &aggs.genre_counts, None)),
        (PRICE_STATS_FILE, &|p: &Path| write_price_stats(p, genre, &aggs.price_stats_by_genre)),
        (RATING_STATS_FILE, &|p: &Path| write_rating_stats(p, genre, &aggs.rating_stats_by_genre)),
        (TOP_EXPENSIVE_FILE, &|p: &Path| write_rows(p, table, &aggs.top_expensive)),
        (TOP_RATED_FILE, &|p: &Path| write_rows(p, table, &aggs.top_rated)),
    ];

    let mut written = Vec::with_capacity(reports.len());
    for (name, write) in reports {
        let path = out_dir.join(name);
        write(&path)?;
        written.push(path);
    }
    info!(files = written.len(), "Wrote CSV reports");
    Ok(written)
}
