//! Bar chart of mean rating per genre.

use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use crate::analyzers::types::GroupMeans;
use crate::error::{PipelineError, Result};

const BAR_COLOR: RGBColor = RGBColor(0x4C, 0x72, 0xB0);
const SIZE: (u32, u32) = (1600, 1000);

/// Bar labels and heights, left to right: ascending by mean, genres without a
/// mean last.
pub fn bars(means: &GroupMeans<'_>) -> Vec<(String, Option<f64>)> {
    means
        .sorted_by_mean()
        .into_iter()
        .map(|row| (row.key.to_string(), row.mean))
        .collect()
}

/// Renders the chart as a PNG at `path`.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn render_rating_chart(path: &Path, means: &GroupMeans<'_>) -> Result<()> {
    let bars = bars(means);
    draw(path, &bars, &means.key_column).map_err(|e| PipelineError::output(path, e))?;
    info!(bars = bars.len(), "Rendered rating chart");
    Ok(())
}

fn draw(
    path: &Path,
    bars: &[(String, Option<f64>)],
    x_desc: &str,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let highest = bars.iter().filter_map(|(_, m)| *m).fold(0.0, f64::max);
    let y_max = if highest > 0.0 { highest * 1.05 } else { 1.0 };
    let slots = bars.len().max(1);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Average Rating by Genre", ("sans-serif", 40))
        .margin(20)
        .x_label_area_size(80)
        .y_label_area_size(80)
        .build_cartesian_2d((0..slots).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(slots)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => bars.get(*i).map(|(l, _)| l.clone()).unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc(x_desc)
        .y_desc("Average Rating")
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BAR_COLOR.filled())
            .margin(10)
            .data(
                bars.iter()
                    .enumerate()
                    .filter_map(|(i, (_, mean))| mean.map(|m| (i, m))),
            ),
    )?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::GroupMean;
    use crate::table::Value;

    #[test]
    fn test_bars_ascend_by_mean() {
        let means = GroupMeans {
            key_column: "Genre".to_string(),
            value_column: "Rating".to_string(),
            rows: vec![
                GroupMean { key: Value::Text("Fiction"), mean: Some(4.6) },
                GroupMean { key: Value::Text("Memoir"), mean: None },
                GroupMean { key: Value::Text("Non Fiction"), mean: Some(4.5) },
            ],
        };

        assert_eq!(
            bars(&means),
            vec![
                ("Non Fiction".to_string(), Some(4.5)),
                ("Fiction".to_string(), Some(4.6)),
                ("Memoir".to_string(), None),
            ]
        );
    }
}
