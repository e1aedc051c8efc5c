use crate::config::WindowConfig;
use crate::types::{DataRow, Metric};

/// Selects the input of a windowed average from a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    /// Raw heart rate of the underlying record.
    HeartRate,
    Metric(Metric),
}

impl Column {
    pub fn value(&self, row: &DataRow) -> Option<f64> {
        match self {
            Column::HeartRate => Some(f64::from(row.record().heart_rate_bpm)),
            Column::Metric(metric) => row.get(*metric),
        }
    }
}

/// Forward-looking mean over `window_size` positions starting at each index.
///
/// Positions past the end reuse the last index. Undefined values and values
/// outside the cutoff range are skipped; the mean is taken over what remains,
/// and is `None` when nothing remains. `enabled` is ignored here.
pub fn window_average(values: &[Option<f64>], config: &WindowConfig) -> Vec<Option<f64>> {
    let Some(last) = values.len().checked_sub(1) else {
        return Vec::new();
    };
    let window = config.window_size.max(1);
    (0..values.len())
        .map(|i| {
            let (sum, count) = (0..window)
                .filter_map(|j| values[(i + j).min(last)])
                .filter(|v| config.admits(*v))
                .fold((0.0_f64, 0_usize), |(sum, count), v| (sum + v, count + 1));
            (count > 0).then(|| sum / count as f64)
        })
        .collect()
}

/// Smooth `input` of every row into a new `output` column.
pub fn window_average_rows(
    rows: &[DataRow],
    input: Column,
    output: Metric,
    config: &WindowConfig,
) -> Vec<DataRow> {
    let values: Vec<Option<f64>> = rows.iter().map(|row| input.value(row)).collect();
    rows.iter()
        .zip(window_average(&values, config))
        .map(|(row, value)| row.with(output, value))
        .collect()
}
