use std::path::{Path, PathBuf};

use tracing::info;

use crate::analyzers::aggregate::Aggregator;
use crate::chart::render_rating_chart;
use crate::cleaning::{coerce_types, deduplicate, normalize_schema};
use crate::error::Result;
use crate::loader::load_table;
use crate::output::{
    CHART_FILE, QUALITY_REPORT_FILE, log_counts, log_group_means, print_json, print_pretty,
    write_reports,
};
use crate::quality::{QualityReport, write_quality_report};

/// Where the pipeline reads from and writes to.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub input: PathBuf,
    pub out_dir: PathBuf,
}

impl Default for RunPaths {
    fn default() -> Self {
        RunPaths {
            input: PathBuf::from("bestsellers.csv"),
            out_dir: PathBuf::from("."),
        }
    }
}

/// Loads, cleans and aggregates the input, then writes every report and the chart.
///
/// Stops at the first structural failure. Reports already written stay on disk.
#[tracing::instrument(skip_all, fields(input = %paths.input.display()))]
pub fn run(paths: &RunPaths) -> Result<()> {
    let table = load_table(&paths.input)?;
    let (table, dedupe) = deduplicate(table);
    let table = normalize_schema(table)?;
    let (table, coercion) = coerce_types(table)?;
    print_pretty(&coercion.failures);

    let aggregator = Aggregator::new(&table)?;
    info!(
        projection = ?aggregator.projection(),
        reviews_tiebreak = aggregator.has_reviews(),
        "Resolved top-N columns"
    );
    let aggs = aggregator.aggregate_all();
    log_counts(&aggs.author_counts);
    log_group_means(&aggs.avg_rating_by_genre);

    let mut written = write_reports(&paths.out_dir, &table, &aggs)?;

    let quality = QualityReport::build(&table, &dedupe, &coercion);
    if let Err(e) = print_json(&quality) {
        tracing::debug!(error = %e, "Could not log quality summary");
    }
    let report_path = out_path(&paths.out_dir, QUALITY_REPORT_FILE);
    write_quality_report(&report_path, &quality)?;
    written.push(report_path);

    let chart_path = out_path(&paths.out_dir, CHART_FILE);
    render_rating_chart(&chart_path, &aggs.avg_rating_by_genre)?;
    written.push(chart_path);

    info!(
        rows = table.row_count(),
        duplicates_removed = dedupe.removed(),
        files = written.len(),
        out_dir = %paths.out_dir.display(),
        "Pipeline finished"
    );
    Ok(())
}

fn out_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}
