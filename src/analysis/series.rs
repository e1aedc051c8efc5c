use serde::Serialize;

use crate::config::{AnalysisOptions, WindowedMetric};
use crate::types::{DataRow, Metric};

/// One plotted sample: x is the record timestamp in epoch milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A named, ordered run of samples handed to whatever draws the chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub metric: Metric,
    pub name: &'static str,
    pub visible: bool,
    pub points: Vec<SamplePoint>,
}

impl Series {
    /// Collect the defined values of `metric`, in row order.
    pub fn from_rows(rows: &[DataRow], metric: Metric, visible: bool) -> Self {
        let points = rows
            .iter()
            .filter_map(|row| {
                let y = row.get(metric)?;
                Some(SamplePoint::new(row.record().timestamp_ms() as f64, y))
            })
            .collect();
        Self {
            metric,
            name: metric.label(),
            visible,
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn x_range(&self) -> Option<(f64, f64)> {
        Some((self.points.first()?.x, self.points.last()?.x))
    }
}

/// The smoothed series, one per governed metric, in declaration order.
pub fn build_series(rows: &[DataRow], options: &AnalysisOptions) -> Vec<Series> {
    WindowedMetric::ALL
        .iter()
        .map(|metric| Series::from_rows(rows, metric.output(), options.get(*metric).enabled))
        .collect()
}

/// Union of the x ranges of `series`.
pub fn x_range<'a>(series: impl IntoIterator<Item = &'a Series>) -> Option<(f64, f64)> {
    series
        .into_iter()
        .filter_map(Series::x_range)
        .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
}
