use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::analyzers::types::{
    Aggregations, CountRow, GroupMean, GroupMeans, PriceStats, RatingStats, RowSlice, ValueCounts,
};
use crate::analyzers::utility::{mean, median, sample_stddev};
use crate::cleaning::{AUTHOR, GENRE, PRICE, PUBLICATION_YEAR, RATING, REVIEWS, TITLE};
use crate::error::Result;
use crate::table::{Column, Table, Value};

/// Columns kept in the top-N slices, in output order, when present.
static PROJECTION: &[&str] = &[TITLE, AUTHOR, PRICE, RATING, GENRE, PUBLICATION_YEAR, REVIEWS];

/// Rows kept in each top-N slice.
pub const TOP_N: usize = 10;

/// Read-only views over a cleaned table.
///
/// The projection and the `Reviews` tie-break are resolved once, from the
/// table's schema, when the aggregator is built.
pub struct Aggregator<'a> {
    table: &'a Table,
    author: &'a Column,
    genre: &'a Column,
    price: &'a Column,
    rating: &'a Column,
    reviews: Option<&'a Column>,
    projection: Vec<String>,
}

impl<'a> Aggregator<'a> {
    /// # Errors
    ///
    /// [`crate::error::PipelineError::Schema`] if a required column is missing.
    pub fn new(table: &'a Table) -> Result<Self> {
        table.require(TITLE)?;
        let projection = PROJECTION
            .iter()
            .filter(|c| table.has_column(c))
            .map(|c| c.to_string())
            .collect();

        Ok(Aggregator {
            table,
            author: table.require(AUTHOR)?,
            genre: table.require(GENRE)?,
            price: table.require(PRICE)?,
            rating: table.require(RATING)?,
            reviews: table.column(REVIEWS),
            projection,
        })
    }

    pub fn projection(&self) -> &[String] {
        &self.projection
    }

    pub fn has_reviews(&self) -> bool {
        self.reviews.is_some()
    }

    /// Computes every view in one pass over the aggregator.
    #[tracing::instrument(skip_all, fields(rows = self.table.row_count()))]
    pub fn aggregate_all(&self) -> Aggregations<'a> {
        Aggregations {
            author_counts: self.author_counts(),
            avg_rating_by_genre: self.avg_rating_by_genre(),
            genre_counts: self.genre_counts(),
            price_stats_by_genre: self.price_stats_by_genre(),
            rating_stats_by_genre: self.rating_stats_by_genre(),
            top_expensive: self.top_expensive(),
            top_rated: self.top_rated(),
        }
    }

    pub fn author_counts(&self) -> ValueCounts<'a> {
        value_counts(self.author)
    }

    pub fn genre_counts(&self) -> ValueCounts<'a> {
        value_counts(self.genre)
    }

    pub fn avg_rating_by_genre(&self) -> GroupMeans<'a> {
        let rows = self
            .genre_groups()
            .into_iter()
            .map(|(key, rows)| GroupMean {
                key,
                mean: mean(&numbers(self.rating, &rows)),
            })
            .collect();
        GroupMeans {
            key_column: self.genre.name.clone(),
            value_column: self.rating.name.clone(),
            rows,
        }
    }

    pub fn price_stats_by_genre(&self) -> Vec<PriceStats<'a>> {
        self.genre_groups()
            .into_iter()
            .map(|(genre, rows)| {
                let present: Vec<Value<'a>> = rows
                    .iter()
                    .map(|&r| self.price.get(r))
                    .filter(|v| !v.is_null())
                    .collect();
                let values: Vec<f64> = present.iter().filter_map(Value::as_f64).collect();
                PriceStats {
                    genre,
                    min: present.iter().copied().min().unwrap_or(Value::Null),
                    median: median(&values),
                    mean: mean(&values),
                    max: present.iter().copied().max().unwrap_or(Value::Null),
                }
            })
            .collect()
    }

    pub fn rating_stats_by_genre(&self) -> Vec<RatingStats<'a>> {
        self.genre_groups()
            .into_iter()
            .map(|(genre, rows)| {
                let values = numbers(self.rating, &rows);
                RatingStats {
                    genre,
                    count: values.len(),
                    mean: mean(&values),
                    std: sample_stddev(&values),
                }
            })
            .collect()
    }

    /// Most expensive priced rows, highest first.
    pub fn top_expensive(&self) -> RowSlice {
        let mut rows: Vec<usize> = (0..self.table.row_count())
            .filter(|&r| !self.price.get(r).is_null())
            .collect();
        rows.sort_by(|&a, &b| descending(self.price.get(a), self.price.get(b)));
        self.slice(rows)
    }

    /// Highest rated rows; more reviews wins a tie when the column exists.
    pub fn top_rated(&self) -> RowSlice {
        let mut rows: Vec<usize> = (0..self.table.row_count()).collect();
        rows.sort_by(|&a, &b| {
            let by_rating = descending(self.rating.get(a), self.rating.get(b));
            match self.reviews {
                Some(reviews) => by_rating.then_with(|| descending(reviews.get(a), reviews.get(b))),
                None => by_rating,
            }
        });
        self.slice(rows)
    }

    fn slice(&self, mut rows: Vec<usize>) -> RowSlice {
        rows.truncate(TOP_N);
        RowSlice {
            columns: self.projection.clone(),
            rows,
        }
    }

    /// Row indices per non-null genre, genres ascending.
    fn genre_groups(&self) -> BTreeMap<Value<'a>, Vec<usize>> {
        let mut groups: BTreeMap<Value<'a>, Vec<usize>> = BTreeMap::new();
        for (row, key) in self.genre.values().enumerate() {
            if !key.is_null() {
                groups.entry(key).or_default().push(row);
            }
        }
        debug!(groups = groups.len(), "Grouped rows by genre");
        groups
    }
}

/// Non-null numbers of `column` at `rows`, in row order.
fn numbers(column: &Column, rows: &[usize]) -> Vec<f64> {
    rows.iter().filter_map(|&r| column.get(r).as_f64()).collect()
}

/// Descending order with nulls after every value.
fn descending(a: Value<'_>, b: Value<'_>) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.cmp(&a),
    }
}

/// Counts of each non-null value, most frequent first; ties keep first-seen order.
fn value_counts(column: &Column) -> ValueCounts<'_> {
    let mut index: HashMap<Value<'_>, usize> = HashMap::new();
    let mut rows: Vec<CountRow<'_>> = Vec::new();
    for key in column.values().filter(|v| !v.is_null()) {
        match index.get(&key) {
            Some(&i) => rows[i].count += 1,
            None => {
                index.insert(key, rows.len());
                rows.push(CountRow { key, count: 1 });
            }
        }
    }
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    ValueCounts {
        column: column.name.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn books(with_reviews: bool) -> Table {
        let mut columns = vec![
            Column::text(
                "Title",
                &[Some("A"), Some("B"), Some("C"), Some("D"), Some("E")],
            ),
            Column::text(
                "Author",
                &[Some("Ann"), Some("Bob"), Some("Bob"), Some("Ann"), Some("Cy")],
            ),
            Column::text(
                "Genre",
                &[
                    Some("Fiction"),
                    Some("Fiction"),
                    Some("Non Fiction"),
                    Some("Fiction"),
                    None,
                ],
            ),
            Column::numeric("Price", &[Some(8.0), Some(20.0), None, Some(12.0), Some(3.0)]),
            Column::numeric("Rating", &[Some(4.0), Some(4.5), Some(4.9), None, Some(4.5)]),
        ];
        if with_reviews {
            columns.push(Column::integer("Reviews", &[10, 100, 5, 7, 300]));
        }
        Table::from_columns(columns).unwrap()
    }

    #[test]
    fn test_value_counts_ties_keep_first_seen_order() {
        let table = books(false);
        let counts = Aggregator::new(&table).unwrap().author_counts();
        let keys: Vec<_> = counts.rows.iter().map(|r| (r.key, r.count)).collect();

        assert_eq!(
            keys,
            vec![
                (Value::Text("Ann"), 2),
                (Value::Text("Bob"), 2),
                (Value::Text("Cy"), 1)
            ]
        );
    }

    #[test]
    fn test_genre_counts_skip_null_genre() {
        let table = books(false);
        let counts = Aggregator::new(&table).unwrap().genre_counts();

        assert_eq!(counts.get(Value::Text("Fiction")), Some(3));
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_avg_rating_ignores_nulls() {
        let table = books(false);
        let avg = Aggregator::new(&table).unwrap().avg_rating_by_genre();

        assert_eq!(avg.key_column, "Genre");
        assert_eq!(avg.value_column, "Rating");
        assert_eq!(avg.get(Value::Text("Fiction")), Some(4.25));
        assert_eq!(avg.rows[1].key, Value::Text("Non Fiction"));
    }

    #[test]
    fn test_rating_stats_counts_non_null() {
        let table = books(false);
        let stats = Aggregator::new(&table).unwrap().rating_stats_by_genre();

        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].mean, Some(4.25));
        assert!((stats[0].std.unwrap() - 0.125_f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats[1].count, 1);
        assert_eq!(stats[1].std, None);
    }

    #[test]
    fn test_price_stats() {
        let table = books(false);
        let stats = Aggregator::new(&table).unwrap().price_stats_by_genre();

        assert_eq!(stats[0].min, Value::Float(8.0));
        assert_eq!(stats[0].median, Some(12.0));
        assert_eq!(stats[0].max, Value::Float(20.0));
        assert_eq!(stats[1].min, Value::Null);
        assert_eq!(stats[1].mean, None);
    }

    #[test]
    fn test_top_expensive_skips_missing_prices() {
        let table = books(false);
        let top = Aggregator::new(&table).unwrap().top_expensive();
        assert_eq!(top.rows, vec![1, 3, 0, 4]);
    }

    #[test]
    fn test_top_rated_without_reviews() {
        let table = books(false);
        let agg = Aggregator::new(&table).unwrap();
        let top = agg.top_rated();

        assert!(!agg.has_reviews());
        assert_eq!(agg.projection(), top.columns.as_slice());
        assert_eq!(top.rows, vec![2, 1, 4, 0, 3]);
        assert!(!top.columns.iter().any(|c| c == "Reviews"));
        assert_eq!(top.columns, vec!["Title", "Author", "Price", "Rating", "Genre"]);
    }

    #[test]
    fn test_top_rated_breaks_ties_on_reviews() {
        let table = books(true);
        let top = Aggregator::new(&table).unwrap().top_rated();

        assert_eq!(top.rows, vec![2, 4, 1, 0, 3]);
        assert_eq!(top.columns.last().map(String::as_str), Some("Reviews"));
    }

    #[test]
    fn test_top_n_is_capped() {
        let n = 25;
        let titles: Vec<String> = (0..n).map(|i| format!("T{i}")).collect();
        let title_refs: Vec<Option<&str>> = titles.iter().map(|t| Some(t.as_str())).collect();
        let prices: Vec<Option<f64>> = (0..n).map(|i| Some(i as f64)).collect();
        let table = Table::from_columns(vec![
            Column::text("Title", &title_refs),
            Column::text("Author", &title_refs),
            Column::text("Genre", &title_refs),
            Column::numeric("Price", &prices),
            Column::numeric("Rating", &prices),
        ])
        .unwrap();
        let agg = Aggregator::new(&table).unwrap();

        assert_eq!(agg.top_expensive().rows.len(), TOP_N);
        assert_eq!(agg.top_rated().rows[0], n - 1);
    }

    #[test]
    fn test_empty_table_yields_empty_views() {
        let table = Table::from_columns(vec![
            Column::text("Title", &[]),
            Column::text("Author", &[]),
            Column::text("Genre", &[]),
            Column::numeric("Price", &[]),
            Column::numeric("Rating", &[]),
        ])
        .unwrap();
        let all = Aggregator::new(&table).unwrap().aggregate_all();

        assert!(all.author_counts.rows.is_empty());
        assert!(all.avg_rating_by_genre.rows.is_empty());
        assert!(all.top_rated.rows.is_empty());
    }

    #[test]
    fn test_missing_required_column() {
        let table = Table::from_columns(vec![Column::text("Title", &[Some("A")])]).unwrap();
        assert!(Aggregator::new(&table).is_err());
    }
}
