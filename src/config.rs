use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::error::ConfigError;
use crate::analysis::filter::Column;
use crate::types::Metric;

/// Largest window the options panel allows.
pub const MAX_WINDOW_SIZE: usize = 300;
/// Window applied to speed when nothing else is configured.
pub const DEFAULT_SPEED_WINDOW: usize = 15;

/// Smoothing settings for one derived metric.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WindowConfig {
    /// Only controls whether the series is shown; the average is computed either way.
    pub enabled: bool,
    pub window_size: usize,
    pub cutoff_min: f64,
    pub cutoff_max: f64,
}

impl WindowConfig {
    pub fn new(enabled: bool, window_size: usize, cutoff_min: f64, cutoff_max: f64) -> Self {
        Self {
            enabled,
            window_size,
            cutoff_min,
            cutoff_max,
        }
    }

    /// Inclusive cutoff check; NaN is never admitted.
    pub fn admits(&self, value: f64) -> bool {
        value >= self.cutoff_min && value <= self.cutoff_max
    }

    pub fn validate(&self, metric: WindowedMetric) -> Result<(), ConfigError> {
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::InvalidWindowSize {
                metric: metric.key(),
                size: self.window_size,
            });
        }
        if !(self.cutoff_min <= self.cutoff_max) {
            return Err(ConfigError::InvertedCutoff {
                metric: metric.key(),
                min: self.cutoff_min,
                max: self.cutoff_max,
            });
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        // Matches the untouched options panel.
        WindowConfig {
            enabled: false,
            window_size: 1,
            cutoff_min: 0.0,
            cutoff_max: 999.0,
        }
    }
}

/// Metrics that are smoothed by a configurable window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowedMetric {
    Speed,
    HeartRate,
    Pace,
    SpeedKmh,
}

impl WindowedMetric {
    pub const ALL: [WindowedMetric; 4] = [
        WindowedMetric::Speed,
        WindowedMetric::HeartRate,
        WindowedMetric::Pace,
        WindowedMetric::SpeedKmh,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            WindowedMetric::Speed => "speed",
            WindowedMetric::HeartRate => "heartRate",
            WindowedMetric::Pace => "pace",
            WindowedMetric::SpeedKmh => "speedKmh",
        }
    }

    /// Column the window reads from.
    pub fn input(&self) -> Column {
        match self {
            WindowedMetric::Speed => Column::Metric(Metric::Speed),
            WindowedMetric::HeartRate => Column::HeartRate,
            WindowedMetric::Pace => Column::Metric(Metric::Pace),
            WindowedMetric::SpeedKmh => Column::Metric(Metric::SpeedKmh),
        }
    }

    /// Column the window writes.
    pub fn output(&self) -> Metric {
        match self {
            WindowedMetric::Speed => Metric::AvgSpeed,
            WindowedMetric::HeartRate => Metric::AvgHeartRate,
            WindowedMetric::Pace => Metric::AvgPace,
            WindowedMetric::SpeedKmh => Metric::AvgSpeedKmh,
        }
    }
}

/// One [`WindowConfig`] per smoothed metric.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    pub speed: WindowConfig,
    pub heart_rate: WindowConfig,
    pub pace: WindowConfig,
    pub speed_kmh: WindowConfig,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            speed: WindowConfig {
                enabled: true,
                window_size: DEFAULT_SPEED_WINDOW,
                ..WindowConfig::default()
            },
            heart_rate: WindowConfig {
                enabled: true,
                ..WindowConfig::default()
            },
            pace: WindowConfig::default(),
            speed_kmh: WindowConfig::default(),
        }
    }
}

impl AnalysisOptions {
    pub fn get(&self, metric: WindowedMetric) -> &WindowConfig {
        match metric {
            WindowedMetric::Speed => &self.speed,
            WindowedMetric::HeartRate => &self.heart_rate,
            WindowedMetric::Pace => &self.pace,
            WindowedMetric::SpeedKmh => &self.speed_kmh,
        }
    }

    pub fn set(&mut self, metric: WindowedMetric, config: WindowConfig) {
        match metric {
            WindowedMetric::Speed => self.speed = config,
            WindowedMetric::HeartRate => self.heart_rate = config,
            WindowedMetric::Pace => self.pace = config,
            WindowedMetric::SpeedKmh => self.speed_kmh = config,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        WindowedMetric::ALL
            .iter()
            .try_for_each(|metric| self.get(*metric).validate(*metric))
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: AnalysisOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
