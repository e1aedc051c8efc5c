// src/session.rs
use std::path::Path;
use std::time::{Duration, Instant};

use log::info;

use crate::analysis::error::TraceError;
use crate::analysis::interpolate::{read_at, read_cursor, CursorReadout, Viewport};
use crate::analysis::pipeline::Derivation;
use crate::analysis::series::{build_series, x_range, Series};
use crate::analysis::source::{LoadedTrace, TraceSource};
use crate::config::{AnalysisOptions, WindowConfig, WindowedMetric};
use crate::export::export_to_path;
use crate::types::{DataRow, TraceRecord};

/// Timings of the last successful load.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadStats {
    pub record_count: usize,
    /// Reading plus parsing the trace.
    pub load_time: Duration,
    /// Share of `load_time` spent building the XML tree, if the source parsed one.
    pub xml_time: Option<Duration>,
    pub derive_time: Duration,
}

struct Loaded {
    records: Vec<TraceRecord>,
    derivation: Derivation,
    stats: LoadStats,
}

/// One opened trace: parsed once, re-derived as the window settings change.
pub struct TraceSession<S: TraceSource> {
    source: S,
    options: AnalysisOptions,
    loaded: Option<Loaded>,
}

impl<S: TraceSource> TraceSession<S> {
    pub fn new(source: S, options: AnalysisOptions) -> Result<Self, TraceError> {
        options.validate()?;
        Ok(Self {
            source,
            options,
            loaded: None,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Statistics of the cached load, if any.
    pub fn stats(&self) -> Option<&LoadStats> {
        self.loaded.as_ref().map(|loaded| &loaded.stats)
    }

    /// Parse and derive unless already cached. Nothing is cached on failure.
    pub fn load(&mut self) -> Result<&LoadStats, TraceError> {
        Ok(&self.ensure_loaded()?.stats)
    }

    /// Drop the cache and load from the source again.
    pub fn reload(&mut self) -> Result<&LoadStats, TraceError> {
        self.loaded = None;
        self.load()
    }

    pub fn records(&mut self) -> Result<&[TraceRecord], TraceError> {
        Ok(&self.ensure_loaded()?.records)
    }

    pub fn rows(&mut self) -> Result<&[DataRow], TraceError> {
        Ok(self.ensure_loaded()?.derivation.rows())
    }

    /// Replace one metric's window, re-deriving only the stages after it.
    ///
    /// An invalid configuration is rejected before anything is recomputed.
    pub fn set_window(
        &mut self,
        metric: WindowedMetric,
        config: WindowConfig,
    ) -> Result<(), TraceError> {
        config.validate(metric)?;
        let mut next = self.options;
        next.set(metric, config);
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.derivation.rerun(metric, &next)?;
        }
        self.options = next;
        Ok(())
    }

    pub fn set_options(&mut self, options: AnalysisOptions) -> Result<(), TraceError> {
        options.validate()?;
        let first_changed = WindowedMetric::ALL
            .into_iter()
            .find(|metric| options.get(*metric) != self.options.get(*metric));
        if let (Some(metric), Some(loaded)) = (first_changed, self.loaded.as_mut()) {
            loaded.derivation.rerun(metric, &options)?;
        }
        self.options = options;
        Ok(())
    }

    /// The smoothed series with their visibility flags.
    pub fn series(&mut self) -> Result<Vec<Series>, TraceError> {
        let options = self.options;
        Ok(build_series(self.rows()?, &options))
    }

    /// Read the visible series at `x`.
    ///
    /// An explicit viewport gates `x` strictly. Without one, the x range of the
    /// visible series is used with its end points included, so every sample
    /// can be read back.
    pub fn read_cursor(
        &mut self,
        x: f64,
        viewport: Option<Viewport>,
    ) -> Result<Option<CursorReadout>, TraceError> {
        let series = self.series()?;
        let visible: Vec<&Series> = series.iter().filter(|s| s.visible).collect();
        if let Some(viewport) = viewport {
            return Ok(read_cursor(visible, x, viewport));
        }
        let Some((x_min, x_max)) = x_range(visible.iter().copied()) else {
            return Ok(None);
        };
        if !(x_min..=x_max).contains(&x) {
            return Ok(None);
        }
        Ok(Some(read_at(visible, x, Viewport::new(x_min, x_max))))
    }

    pub fn export_csv(&mut self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        export_to_path(path, self.rows()?)
    }

    fn ensure_loaded(&mut self) -> Result<&Loaded, TraceError> {
        let loaded = match self.loaded.take() {
            Some(loaded) => loaded,
            None => self.load_fresh()?,
        };
        Ok(self.loaded.insert(loaded))
    }

    fn load_fresh(&mut self) -> Result<Loaded, TraceError> {
        let started = Instant::now();
        let LoadedTrace { records, xml_time } = self.source.load()?;
        let load_time = started.elapsed();

        let started = Instant::now();
        let derivation = Derivation::run(&records, &self.options)?;
        let derive_time = started.elapsed();

        let stats = LoadStats {
            record_count: records.len(),
            load_time,
            xml_time,
            derive_time,
        };
        match xml_time {
            Some(xml) => info!(
                "parsing {} points took {} ms ({} ms in XML), derivation {} ms",
                stats.record_count,
                load_time.as_millis(),
                xml.as_millis(),
                derive_time.as_millis()
            ),
            None => info!(
                "loaded {} points in {} ms, derivation {} ms",
                stats.record_count,
                load_time.as_millis(),
                derive_time.as_millis()
            ),
        }
        Ok(Loaded {
            records,
            derivation,
            stats,
        })
    }
}
