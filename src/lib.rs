// src/lib.rs
//! Running-trace analysis: strict TCX ingestion, a fixed chain of derived
//! metrics with windowed smoothing, nearest-sample cursor lookups and a
//! semicolon CSV export.
pub mod analysis;
pub mod config;
pub mod export;
pub mod format;
pub mod session;
pub mod types;

pub use analysis::{
    derive, parse_tcx, ConfigError, CursorReadout, IngestError, Lookup, ManualSource,
    PipelineError, Series, TcxFile, TraceError, TraceSource, Viewport,
};
pub use config::{AnalysisOptions, WindowConfig, WindowedMetric};
pub use export::{export_to_path, CsvExport, DEFAULT_EXPORT_FILE};
pub use session::{LoadStats, TraceSession};
pub use types::{DataRow, Metric, TraceRecord};
