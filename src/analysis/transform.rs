use log::{debug, warn};

use crate::analysis::error::PipelineError;
use crate::types::TraceRecord;

/// Every retained sample is expected exactly one second after its predecessor.
pub const CADENCE_MS: i64 = 1000;
/// Below walking pace a sample is treated as standing still.
pub const MIN_MOVING_SPEED_KMH: f64 = 3.6;
/// Speeds (m/s) at or below this magnitude yield no pace.
pub const PACE_SPEED_EPSILON: f64 = 0.01;

pub fn mps_to_kmh(meters_per_second: f64) -> f64 {
    meters_per_second * 3.6
}

pub fn kmh_to_mps(kilometers_per_hour: f64) -> f64 {
    kilometers_per_hour / 3.6
}

/// Forward-difference speed in m/s for each record.
///
/// The value for record `i` is measured against record `i + 1`; the last record
/// never gets one. A first pair off the 1 Hz grid and stationary samples give
/// `None`. Any later pair off the grid aborts the whole computation.
pub fn instantaneous_speeds(records: &[TraceRecord]) -> Result<Vec<Option<f64>>, PipelineError> {
    let mut speeds = Vec::with_capacity(records.len());
    let min_speed = kmh_to_mps(MIN_MOVING_SPEED_KMH);
    for (index, pair) in records.windows(2).enumerate() {
        let (a, b) = (&pair[0], &pair[1]);
        let elapsed_ms = b.timestamp_ms() - a.timestamp_ms();
        let travelled = b.distance_meters - a.distance_meters;
        let speed = travelled / (elapsed_ms as f64 / 1000.0);

        if index == 0 && elapsed_ms != CADENCE_MS {
            debug!("ignoring starting point with a {elapsed_ms} ms time jump");
            speeds.push(None);
            continue;
        }
        if speed <= min_speed {
            debug!("ignoring point #{index} with low speed {speed:.3} m/s");
            speeds.push(None);
            continue;
        }
        if elapsed_ms != CADENCE_MS {
            warn!("expected {CADENCE_MS} ms between samples, got {elapsed_ms} ms at point #{index}");
            return Err(PipelineError::CadenceViolation { index, elapsed_ms });
        }
        speeds.push(Some(speed));
    }
    if !records.is_empty() {
        speeds.push(None);
    }
    Ok(speeds)
}

/// Minutes per kilometre for a speed in m/s.
pub fn pace_from_speed(speed_mps: Option<f64>) -> Option<f64> {
    let speed = speed_mps?;
    if speed.abs() <= PACE_SPEED_EPSILON {
        return None;
    }
    Some(1.0 / (mps_to_kmh(speed) / 60.0))
}
