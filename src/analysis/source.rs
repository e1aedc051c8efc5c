use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analysis::error::IngestError;
use crate::analysis::tcx::parse_tcx_timed;
use crate::types::TraceRecord;

/// Records produced by one load, with the time spent building the XML tree
/// when the source had to parse one.
#[derive(Clone, Debug, Default)]
pub struct LoadedTrace {
    pub records: Vec<TraceRecord>,
    pub xml_time: Option<Duration>,
}

/// Something that can produce a trace on demand.
pub trait TraceSource {
    fn load(&mut self) -> Result<LoadedTrace, IngestError>;
}

/// A TCX file on disk, read and parsed on every load.
#[derive(Clone, Debug)]
pub struct TcxFile {
    path: PathBuf,
}

impl TcxFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSource for TcxFile {
    fn load(&mut self) -> Result<LoadedTrace, IngestError> {
        let bytes = fs::read(&self.path).map_err(|source| IngestError::Io {
            path: self.path.clone(),
            source,
        })?;
        let (records, xml_time) = parse_tcx_timed(&bytes)?;
        Ok(LoadedTrace {
            records,
            xml_time: Some(xml_time),
        })
    }
}

/// In-memory source useful for tests and replay. Each load hands out the
/// next queued trace; once only one is left it is handed out repeatedly.
#[derive(Clone, Debug)]
pub struct ManualSource {
    queue: VecDeque<Vec<TraceRecord>>,
    loads: usize,
}

impl ManualSource {
    pub fn new(records: Vec<TraceRecord>) -> Self {
        Self::sequence([records])
    }

    pub fn sequence(traces: impl IntoIterator<Item = Vec<TraceRecord>>) -> Self {
        Self {
            queue: traces.into_iter().collect(),
            loads: 0,
        }
    }

    /// How many times `load` has been called.
    pub fn loads(&self) -> usize {
        self.loads
    }
}

impl TraceSource for ManualSource {
    fn load(&mut self) -> Result<LoadedTrace, IngestError> {
        self.loads += 1;
        let records = if self.queue.len() > 1 {
            self.queue.pop_front().unwrap_or_default()
        } else {
            self.queue.front().cloned().unwrap_or_default()
        };
        Ok(LoadedTrace {
            records,
            xml_time: None,
        })
    }
}
