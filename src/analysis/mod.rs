// src/analysis/mod.rs
pub mod error;
pub mod filter;
pub mod interpolate;
pub mod pipeline;
pub mod series;
pub mod source;
pub mod tcx;
pub mod transform;

pub use error::{ConfigError, IngestError, Location, PipelineError, TraceError};
pub use filter::{window_average, window_average_rows, Column};
pub use interpolate::{
    lookup, read_at, read_cursor, CursorReadout, Label, LabelSide, Lookup, Marker, SeriesReading,
    Viewport,
};
pub use pipeline::{derive, Derivation, Stage, StageKind, STAGES};
pub use series::{build_series, x_range, SamplePoint, Series};
pub use source::{LoadedTrace, ManualSource, TcxFile, TraceSource};
pub use tcx::{parse_tcx, parse_tcx_timed};
pub use transform::{instantaneous_speeds, kmh_to_mps, mps_to_kmh, pace_from_speed};
