//! Aggregation over the cleaned book table.
//!
//! This module groups and ranks the rows, collects the results into
//! [`types::Aggregations`], and drives the full pipeline from input CSV to
//! written reports.

pub mod aggregate;
pub mod analyzer;
pub mod types;
pub mod utility;
