//! Result types produced by the aggregator.
//!
//! Group keys and projected cells borrow from the cleaned [`Table`], so the
//! table must outlive every view computed over it.

use serde::{Serialize, Serializer};

use crate::table::{Table, Value};

impl Serialize for Value<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::Null => serializer.serialize_none(),
            Value::Int(i) => serializer.serialize_i64(i),
            Value::Float(f) => serializer.serialize_f64(f),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One entry of a frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRow<'a> {
    pub key: Value<'a>,
    pub count: usize,
}

/// Frequency of each distinct value in `column`, most frequent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCounts<'a> {
    pub column: String,
    pub rows: Vec<CountRow<'a>>,
}

impl ValueCounts<'_> {
    pub fn total(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    pub fn get(&self, key: Value<'_>) -> Option<usize> {
        self.rows.iter().find(|r| r.key == key).map(|r| r.count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean<'a> {
    pub key: Value<'a>,
    pub mean: Option<f64>,
}

/// Mean of `value_column` per distinct `key_column`, keys ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMeans<'a> {
    pub key_column: String,
    pub value_column: String,
    pub rows: Vec<GroupMean<'a>>,
}

impl GroupMeans<'_> {
    pub fn get(&self, key: Value<'_>) -> Option<f64> {
        self.rows.iter().find(|r| r.key == key).and_then(|r| r.mean)
    }

    /// Rows re-ordered by mean, ascending; undefined means go last.
    pub fn sorted_by_mean(&self) -> Vec<GroupMean<'_>> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| match (a.mean, b.mean) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        rows
    }
}

/// Price distribution within one genre. `min` and `max` keep the price
/// column's storage type; all four are empty when the genre has no prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStats<'a> {
    pub genre: Value<'a>,
    pub min: Value<'a>,
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub max: Value<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingStats<'a> {
    pub genre: Value<'a>,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

/// An ordered selection of rows restricted to a column projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSlice {
    pub columns: Vec<String>,
    pub rows: Vec<usize>,
}

impl RowSlice {
    /// Projected cells of each selected row, in slice order.
    pub fn records<'a>(&'a self, table: &'a Table) -> impl Iterator<Item = Vec<Value<'a>>> + 'a {
        let columns: Vec<_> = self
            .columns
            .iter()
            .filter_map(|name| table.column(name))
            .collect();
        self.rows
            .iter()
            .map(move |&row| columns.iter().map(|c| c.get(row)).collect())
    }
}

/// Every view the reports are written from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregations<'a> {
    pub author_counts: ValueCounts<'a>,
    pub avg_rating_by_genre: GroupMeans<'a>,
    pub genre_counts: ValueCounts<'a>,
    pub price_stats_by_genre: Vec<PriceStats<'a>>,
    pub rating_stats_by_genre: Vec<RatingStats<'a>>,
    pub top_expensive: RowSlice,
    pub top_rated: RowSlice,
}
