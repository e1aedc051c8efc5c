use std::fmt;
use std::time::Instant;

use log::debug;

use crate::analysis::error::PipelineError;
use crate::analysis::filter::window_average_rows;
use crate::analysis::transform::{instantaneous_speeds, mps_to_kmh, pace_from_speed};
use crate::config::{AnalysisOptions, WindowedMetric};
use crate::types::{DataRow, Metric, TraceRecord};

/// How one stage computes its column.
#[derive(Clone, Copy)]
pub enum StageKind {
    /// Difference against the next record.
    Speed,
    /// Pure function of the row's existing columns.
    Pointwise(fn(&DataRow) -> Option<f64>),
    /// Windowed average governed by one configurable metric.
    Window(WindowedMetric),
}

impl fmt::Debug for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Speed => f.write_str("Speed"),
            StageKind::Pointwise(_) => f.write_str("Pointwise"),
            StageKind::Window(metric) => f.debug_tuple("Window").field(metric).finish(),
        }
    }
}

/// One link of the derivation chain: appends exactly one column.
#[derive(Clone, Copy, Debug)]
pub struct Stage {
    pub output: Metric,
    pub kind: StageKind,
}

impl Stage {
    pub fn governed_by(&self) -> Option<WindowedMetric> {
        match self.kind {
            StageKind::Window(metric) => Some(metric),
            _ => None,
        }
    }

    pub fn run(
        &self,
        rows: &[DataRow],
        options: &AnalysisOptions,
    ) -> Result<Vec<DataRow>, PipelineError> {
        let out = match self.kind {
            StageKind::Speed => {
                let records: Vec<TraceRecord> = rows.iter().map(|row| *row.record()).collect();
                let speeds = instantaneous_speeds(&records)?;
                rows.iter()
                    .zip(speeds)
                    .map(|(row, speed)| row.with(self.output, speed))
                    .collect()
            }
            StageKind::Pointwise(transform) => rows
                .iter()
                .map(|row| row.with(self.output, transform(row)))
                .collect(),
            StageKind::Window(metric) => {
                window_average_rows(rows, metric.input(), self.output, options.get(metric))
            }
        };
        Ok(out)
    }
}

fn pace_of_speed(row: &DataRow) -> Option<f64> {
    pace_from_speed(row.get(Metric::Speed))
}

fn kmh_of_avg_speed(row: &DataRow) -> Option<f64> {
    row.get(Metric::AvgSpeed).map(mps_to_kmh)
}

/// The fixed derivation order; each stage may read any column produced before it.
pub const STAGES: [Stage; 7] = [
    Stage {
        output: Metric::Speed,
        kind: StageKind::Speed,
    },
    Stage {
        output: Metric::AvgSpeed,
        kind: StageKind::Window(WindowedMetric::Speed),
    },
    Stage {
        output: Metric::AvgHeartRate,
        kind: StageKind::Window(WindowedMetric::HeartRate),
    },
    Stage {
        output: Metric::Pace,
        kind: StageKind::Pointwise(pace_of_speed),
    },
    Stage {
        output: Metric::AvgPace,
        kind: StageKind::Window(WindowedMetric::Pace),
    },
    Stage {
        output: Metric::SpeedKmh,
        kind: StageKind::Pointwise(kmh_of_avg_speed),
    },
    Stage {
        output: Metric::AvgSpeedKmh,
        kind: StageKind::Window(WindowedMetric::SpeedKmh),
    },
];

/// Output of every stage of one pipeline run, kept so that a single
/// configuration change only recomputes what lies downstream of it.
#[derive(Clone, Debug)]
pub struct Derivation {
    base: Vec<DataRow>,
    outputs: Vec<Vec<DataRow>>,
}

impl Derivation {
    pub fn run(records: &[TraceRecord], options: &AnalysisOptions) -> Result<Self, PipelineError> {
        let base: Vec<DataRow> = records.iter().copied().map(DataRow::new).collect();
        let outputs = run_stages(&base, 0, options)?;
        Ok(Self { base, outputs })
    }

    /// Recompute from the first stage governed by `changed`.
    ///
    /// On error the previous outputs are left untouched.
    pub fn rerun(
        &mut self,
        changed: WindowedMetric,
        options: &AnalysisOptions,
    ) -> Result<(), PipelineError> {
        let Some(first) = STAGES
            .iter()
            .position(|stage| stage.governed_by() == Some(changed))
        else {
            return Ok(());
        };
        let input = if first == 0 {
            &self.base
        } else {
            &self.outputs[first - 1]
        };
        let fresh = run_stages(input, first, options)?;
        self.outputs.truncate(first);
        self.outputs.extend(fresh);
        Ok(())
    }

    /// Rows carrying every column of the chain.
    pub fn rows(&self) -> &[DataRow] {
        self.outputs.last().map(Vec::as_slice).unwrap_or(&self.base)
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

fn run_stages(
    input: &[DataRow],
    from: usize,
    options: &AnalysisOptions,
) -> Result<Vec<Vec<DataRow>>, PipelineError> {
    let mut outputs: Vec<Vec<DataRow>> = Vec::with_capacity(STAGES.len() - from);
    for stage in &STAGES[from..] {
        let started = Instant::now();
        let previous = outputs.last().map(Vec::as_slice).unwrap_or(input);
        let rows = stage.run(previous, options)?;
        debug!(
            "stage {} over {} rows took {:?}",
            stage.output.key(),
            rows.len(),
            started.elapsed()
        );
        outputs.push(rows);
    }
    Ok(outputs)
}

/// Run the whole chain once and return the final rows.
pub fn derive(
    records: &[TraceRecord],
    options: &AnalysisOptions,
) -> Result<Vec<DataRow>, PipelineError> {
    let mut derivation = Derivation::run(records, options)?;
    Ok(derivation.outputs.pop().unwrap_or(derivation.base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowConfig;
    use crate::types::fixtures::{record_at, records_1hz};

    fn options_with_speed_window(window_size: usize) -> AnalysisOptions {
        let mut options = AnalysisOptions::default();
        options.set(
            WindowedMetric::Speed,
            WindowConfig::new(true, window_size, 0.0, 999.0),
        );
        options
    }

    #[test]
    fn five_samples_at_one_hertz() {
        let records = records_1hz(&[0.0, 5.0, 10.0, 15.0, 20.0]);
        let rows = derive(&records, &options_with_speed_window(2)).unwrap();
        assert_eq!(rows.len(), 5);
        let speeds: Vec<Option<f64>> = rows.iter().map(|r| r.get(Metric::Speed)).collect();
        assert_eq!(speeds, vec![Some(5.0), Some(5.0), Some(5.0), Some(5.0), None]);
        assert_eq!(rows[0].get(Metric::AvgSpeed), Some(5.0));
        // [5, None] at the tail still averages the defined value
        assert_eq!(rows[3].get(Metric::AvgSpeed), Some(5.0));
        assert_eq!(rows[4].get(Metric::AvgSpeed), None);
        assert!((rows[0].get(Metric::SpeedKmh).unwrap() - 18.0).abs() < 1e-9);
        let pace = rows[0].get(Metric::Pace).unwrap();
        assert!((pace - 60.0 / 18.0).abs() < 1e-9);
    }

    #[test]
    fn every_row_carries_the_full_chain_in_order() {
        let rows = derive(&records_1hz(&[0.0, 3.0, 6.0]), &AnalysisOptions::default()).unwrap();
        for row in &rows {
            let columns: Vec<Metric> = row.columns().map(|(m, _)| m).collect();
            assert_eq!(columns, Metric::ALL.to_vec());
        }
    }

    #[test]
    fn cadence_violation_aborts_derivation() {
        let records = vec![
            record_at(0, 0.0, 120),
            record_at(1000, 3.0, 120),
            record_at(2000, 6.0, 120),
            record_at(4000, 12.0, 120),
        ];
        let result = derive(&records, &AnalysisOptions::default());
        assert!(matches!(
            result,
            Err(PipelineError::CadenceViolation { index: 2, elapsed_ms: 2000 })
        ));
    }

    #[test]
    fn rerun_matches_a_full_run() {
        let records = records_1hz(&[0.0, 2.0, 5.0, 9.0, 12.0, 14.5, 18.0]);
        let mut options = AnalysisOptions::default();
        let mut derivation = Derivation::run(&records, &options).unwrap();

        options.set(WindowedMetric::Pace, WindowConfig::new(true, 3, 2.0, 20.0));
        derivation.rerun(WindowedMetric::Pace, &options).unwrap();
        assert_eq!(derivation.rows(), derive(&records, &options).unwrap().as_slice());

        options.set(WindowedMetric::Speed, WindowConfig::new(false, 4, 2.5, 4.0));
        derivation.rerun(WindowedMetric::Speed, &options).unwrap();
        assert_eq!(derivation.rows(), derive(&records, &options).unwrap().as_slice());
    }

    #[test]
    fn speed_window_feeds_the_kmh_columns() {
        let records = records_1hz(&[0.0, 2.0, 6.0, 8.0]);
        let rows = derive(&records, &options_with_speed_window(2)).unwrap();
        // speeds [2, 4, 2, None] -> avg [3, 3, 2, None]
        assert_eq!(rows[0].get(Metric::AvgSpeed), Some(3.0));
        assert!((rows[0].get(Metric::SpeedKmh).unwrap() - 10.8).abs() < 1e-9);
        assert_eq!(rows[3].get(Metric::SpeedKmh), None);
        assert_eq!(rows[3].get(Metric::AvgSpeedKmh), None);
    }

    #[test]
    fn empty_trace_derives_nothing() {
        let derivation = Derivation::run(&[], &AnalysisOptions::default()).unwrap();
        assert!(derivation.is_empty());
        assert!(derivation.rows().is_empty());
    }
}
