//! CSV ingestion with per-column type inference.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::table::{Column, ColumnData, Table};

/// Cell contents that load as missing values.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub(crate) fn is_na(cell: &str) -> bool {
    NA_TOKENS.contains(&cell)
}

pub(crate) fn parse_int(cell: &str) -> Option<i64> {
    cell.trim().parse().ok()
}

pub(crate) fn parse_float(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Reads the CSV at `path` into a [`Table`].
///
/// # Errors
///
/// [`PipelineError::InputNotFound`] when the file does not exist,
/// [`PipelineError::Io`] when it cannot be opened, and
/// [`PipelineError::Parse`] when its contents are not a well-formed CSV.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_csv(file, path)?;
    for column in table.columns() {
        debug!(column = %column.name, kind = ?column.kind(), "Inferred column type");
    }
    info!(
        rows = table.row_count(),
        columns = table.columns().len(),
        "Loaded input table"
    );
    Ok(table)
}

/// Parses CSV text with a header row from any reader.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    parse_csv(reader, Path::new("<reader>"))
}

/// Read failures keep their I/O cause; everything else is a malformed CSV.
fn csv_error(err: csv::Error, path: &Path) -> PipelineError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => PipelineError::Io {
            path: path.to_path_buf(),
            source,
        },
        _ => PipelineError::Parse { message },
    }
}

fn parse_csv<R: Read>(reader: R, path: &Path) -> Result<Table> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers().map_err(|e| csv_error(e, path))?.clone();
    if headers.is_empty() {
        return Err(PipelineError::Parse {
            message: "no columns to parse from file".to_string(),
        });
    }
    let names = dedupe_headers(headers.iter());
    let width = names.len();

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); width];
    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(e, path))?;
        if record.len() > width {
            let line = record.position().map_or(0, |p| p.line());
            return Err(PipelineError::Parse {
                message: format!(
                    "expected {width} fields in line {line}, saw {}",
                    record.len()
                ),
            });
        }
        for (i, column) in cells.iter_mut().enumerate() {
            let cell = record.get(i).filter(|c| !is_na(c)).map(str::to_string);
            column.push(cell);
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| infer_column(name, cells))
        .collect();
    Table::from_columns(columns)
}

/// Disambiguates repeated header names as `name`, `name.1`, `name.2`, ...
fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::new();
    for header in headers {
        let mut name = header.to_string();
        while let Some(count) = seen.get_mut(&name) {
            *count += 1;
            name = format!("{header}.{}", *count - 1);
        }
        seen.insert(name.clone(), 1);
        names.push(name);
    }
    names
}

fn infer_column(name: String, cells: Vec<Option<String>>) -> Column {
    let ints: Option<Vec<i64>> = cells
        .iter()
        .map(|c| c.as_deref().and_then(parse_int))
        .collect();
    if let Some(ints) = ints.filter(|v| !v.is_empty()) {
        return Column::new(name, ColumnData::Integer(ints));
    }

    let floats: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|c| match c {
            None => Some(None),
            Some(s) => parse_float(s).map(Some),
        })
        .collect();
    if let Some(floats) = floats {
        return Column::new(name, ColumnData::Numeric(floats));
    }

    Column::new(name, ColumnData::Text(cells))
}
