use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// 1-based position of a node in the trace document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// The trace document does not have the shape the analysis relies on.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("trace is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("expected <{expected}> but found <{found}> at {location}")]
    UnexpectedNode {
        expected: &'static str,
        found: String,
        location: Location,
    },
    #[error("<{parent}> at {location} must have {expected} child node(s), found {actual}")]
    ChildCount {
        parent: String,
        expected: usize,
        actual: usize,
        location: Location,
    },
    #[error("<{parent}> at {location} must contain exactly one <{child}>, found {actual}")]
    NodeCount {
        parent: &'static str,
        child: &'static str,
        actual: usize,
        location: Location,
    },
    #[error("<{parent}> at {location} has no <{expected}> child")]
    MissingChild {
        parent: String,
        expected: &'static str,
        location: Location,
    },
    #[error("activity has no Sport attribute")]
    MissingSport,
    #[error("only Running activities are supported, found {0:?}")]
    UnsupportedSport(String),
    #[error("invalid {field} value {text:?} at {location}")]
    InvalidNumber {
        field: &'static str,
        text: String,
        location: Location,
    },
    #[error("invalid timestamp {text:?} at {location}")]
    InvalidTimestamp { text: String, location: Location },
    #[error("timestamp {current} at {location} does not advance past {previous}")]
    TimestampOrder {
        previous: String,
        current: String,
        location: Location,
    },
}

/// The derived series would rest on a broken sampling assumption.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("sample cadence must be 1000 ms, got {elapsed_ms} ms after record #{index}")]
    CadenceViolation { index: usize, elapsed_ms: i64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("window size for {metric} must be between 1 and 300, got {size}")]
    InvalidWindowSize { metric: &'static str, size: usize },
    #[error("cutoff range for {metric} is inverted: [{min}, {max}]")]
    InvertedCutoff {
        metric: &'static str,
        min: f64,
        max: f64,
    },
    #[error("failed to read options file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Anything that stops a whole load, derivation or export.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to write export: {0}")]
    Export(#[from] std::io::Error),
}
