// src/types.rs
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One raw sample of a running activity, as read from the trace file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub latitude_degrees: f64,
    pub longitude_degrees: f64,
    pub altitude_meters: f64,
    pub distance_meters: f64,
    pub heart_rate_bpm: i32,
}

impl TraceRecord {
    /// Milliseconds since the Unix epoch; the shared x axis of every series.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Named columns the derivation pipeline appends, in chain order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Speed,
    AvgSpeed,
    AvgHeartRate,
    Pace,
    AvgPace,
    SpeedKmh,
    AvgSpeedKmh,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Speed,
        Metric::AvgSpeed,
        Metric::AvgHeartRate,
        Metric::Pace,
        Metric::AvgPace,
        Metric::SpeedKmh,
        Metric::AvgSpeedKmh,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::Speed => "speed",
            Metric::AvgSpeed => "avgSpeed",
            Metric::AvgHeartRate => "avgHeartRate",
            Metric::Pace => "pace",
            Metric::AvgPace => "avgPace",
            Metric::SpeedKmh => "speedKmh",
            Metric::AvgSpeedKmh => "avgSpeedKmh",
        }
    }

    /// Human readable series title.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Speed => "Speed in m/s",
            Metric::AvgSpeed => "Avg. Speed in m/s",
            Metric::AvgHeartRate => "Avg. Heartrate in BPM",
            Metric::Pace => "Pace in min/km",
            Metric::AvgPace => "Avg. Pace in min/km",
            Metric::SpeedKmh => "Speed in km/h",
            Metric::AvgSpeedKmh => "Avg. Speed in km/h",
        }
    }
}

/// A trace record plus the metric columns derived for it so far.
///
/// Rows are never mutated in place: every pipeline stage builds a fresh row
/// via [`DataRow::with`].
#[derive(Clone, Debug, PartialEq)]
pub struct DataRow {
    record: TraceRecord,
    metrics: Vec<(Metric, Option<f64>)>,
}

impl DataRow {
    pub fn new(record: TraceRecord) -> Self {
        Self {
            record,
            metrics: Vec::new(),
        }
    }

    pub fn record(&self) -> &TraceRecord {
        &self.record
    }

    /// Value of `metric`, `None` when the column is absent or undefined for this row.
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(m, _)| *m == metric)
            .and_then(|(_, value)| *value)
    }

    pub fn has_column(&self, metric: Metric) -> bool {
        self.metrics.iter().any(|(m, _)| *m == metric)
    }

    /// Columns in the order they were appended.
    pub fn columns(&self) -> impl Iterator<Item = (Metric, Option<f64>)> + '_ {
        self.metrics.iter().copied()
    }

    /// Copy of this row with one more column layered on top.
    pub fn with(&self, metric: Metric, value: Option<f64>) -> DataRow {
        let mut metrics = Vec::with_capacity(self.metrics.len() + 1);
        metrics.extend(self.metrics.iter().copied().filter(|(m, _)| *m != metric));
        metrics.push((metric, value));
        DataRow {
            record: self.record,
            metrics,
        }
    }
}
