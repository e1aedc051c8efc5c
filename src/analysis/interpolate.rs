use serde::Serialize;

use crate::analysis::series::{SamplePoint, Series};
use crate::format::{format_axis_time, format_general};
use crate::types::Metric;

/// What a series shows at a query position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Lookup {
    /// Query outside the sampled range, or no samples at all.
    Miss,
    /// A sample sits at the query position.
    Exact(SamplePoint),
    /// Straight line between the closest samples on either side.
    Interpolated(SamplePoint),
}

impl Lookup {
    pub fn point(&self) -> Option<SamplePoint> {
        match self {
            Lookup::Miss => None,
            Lookup::Exact(point) | Lookup::Interpolated(point) => Some(*point),
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.point().map(|point| point.y)
    }
}

/// Nearest-sample lookup over `points`, which must be sorted by x.
///
/// Scans every sample, keeping the closest sample to the right of `x` and
/// the latest one to its left. A sample at `x` ends the scan as an exact
/// match. A left sample that is not closer than the best right sample also
/// ends the scan as an exact match; with ascending input no right sample
/// precedes a left one, so that branch only matters for unsorted data.
pub fn lookup(points: &[SamplePoint], x: f64) -> Lookup {
    if !x.is_finite() {
        return Lookup::Miss;
    }
    let mut left: Option<SamplePoint> = None;
    let mut right: Option<SamplePoint> = None;
    let mut min_distance_right = f64::MAX;

    for point in points {
        if point.x > x {
            let distance = point.x - x;
            if distance < min_distance_right {
                min_distance_right = distance;
                right = Some(*point);
            }
        } else if point.x < x {
            if x - point.x < min_distance_right {
                left = Some(*point);
            } else {
                return Lookup::Exact(*point);
            }
        } else {
            return Lookup::Exact(*point);
        }
    }

    match (left, right) {
        (Some(l), Some(r)) => {
            let slope = (r.y - l.y) / (r.x - l.x);
            Lookup::Interpolated(SamplePoint::new(x, l.y + slope * (x - l.x)))
        }
        _ => Lookup::Miss,
    }
}

/// Visible x-axis range of the chart.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
}

impl Viewport {
    pub fn new(x_min: f64, x_max: f64) -> Self {
        Self { x_min, x_max }
    }

    /// Strict: the axis bounds themselves show no cursor.
    pub fn contains(&self, x: f64) -> bool {
        self.x_min < x && x < self.x_max
    }

    pub fn midpoint(&self) -> f64 {
        (self.x_min + self.x_max) / 2.0
    }
}

/// Which side of its marker a label is drawn on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelSide {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Label {
    pub text: String,
    pub side: LabelSide,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub point: SamplePoint,
    pub label: Option<Label>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesReading {
    pub metric: Metric,
    pub name: &'static str,
    pub lookup: Lookup,
}

impl SeriesReading {
    /// Where to draw this reading. Only interpolated points are labelled;
    /// past the middle of the viewport the label flips to the left.
    pub fn marker(&self, viewport: &Viewport) -> Option<Marker> {
        match self.lookup {
            Lookup::Miss => None,
            Lookup::Exact(point) => Some(Marker { point, label: None }),
            Lookup::Interpolated(point) => {
                let side = if point.x > viewport.midpoint() {
                    LabelSide::Left
                } else {
                    LabelSide::Right
                };
                Some(Marker {
                    point,
                    label: Some(Label {
                        text: format_general(point.y, '.'),
                        side,
                    }),
                })
            }
        }
    }
}

/// Values under the cursor, one reading per series in declaration order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CursorReadout {
    pub x: f64,
    pub viewport: Viewport,
    pub readings: Vec<SeriesReading>,
}

impl CursorReadout {
    pub fn markers(&self) -> Vec<Option<Marker>> {
        self.readings
            .iter()
            .map(|reading| reading.marker(&self.viewport))
            .collect()
    }

    /// One-line summary for a status bar.
    pub fn status_line(&self) -> String {
        let time = format_axis_time(self.x).unwrap_or_else(|| "-".to_string());
        let mut line = format!("Time {time}");
        for reading in &self.readings {
            match reading.lookup.value() {
                Some(value) => line.push_str(&format!(", {} {:.2}", reading.name, value)),
                None => line.push_str(&format!(", {} -", reading.name)),
            }
        }
        line
    }
}

/// Query every series at `x`; `None` when `x` is not strictly inside `viewport`.
pub fn read_cursor<'a>(
    series: impl IntoIterator<Item = &'a Series>,
    x: f64,
    viewport: Viewport,
) -> Option<CursorReadout> {
    if !viewport.contains(x) {
        return None;
    }
    Some(read_at(series, x, viewport))
}

/// Query every series at `x` without gating on the viewport, which only
/// places the labels.
pub fn read_at<'a>(
    series: impl IntoIterator<Item = &'a Series>,
    x: f64,
    viewport: Viewport,
) -> CursorReadout {
    let readings = series
        .into_iter()
        .map(|s| SeriesReading {
            metric: s.metric,
            name: s.name,
            lookup: lookup(&s.points, x),
        })
        .collect();
    CursorReadout {
        x,
        viewport,
        readings,
    }
}
