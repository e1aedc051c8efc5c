use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::analysis::error::TraceError;
use crate::analysis::transform::mps_to_kmh;
use crate::format::{format_general, format_iso_timestamp};
use crate::types::{DataRow, Metric};

pub const EXPORT_HEADER: &str =
    "Index;Date and Time;Speed in m/s;Speed in km/h;Pace in min/km;Heartbeat in bpm";
pub const DEFAULT_EXPORT_FILE: &str = "avgSpeeds.csv";

const SEPARATOR: char = ';';
const DECIMAL_SEPARATOR: char = ',';

/// Semicolon-separated writer with comma decimals.
pub struct CsvExport<W: Write> {
    writer: W,
    index: usize,
}

impl<W: Write> CsvExport<W> {
    /// Writes the header line immediately.
    pub fn new(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "{EXPORT_HEADER}")?;
        Ok(Self { writer, index: 0 })
    }

    pub fn write_row(&mut self, row: &DataRow) -> io::Result<()> {
        self.index += 1;
        let speed = row.get(Metric::Speed);
        let fields = [
            self.index.to_string(),
            format_iso_timestamp(&row.record().timestamp),
            number(speed),
            number(speed.map(mps_to_kmh)),
            number(row.get(Metric::Pace)),
            row.record().heart_rate_bpm.to_string(),
        ];
        writeln!(self.writer, "{}", fields.join(&SEPARATOR.to_string()))
    }

    /// Rows written so far.
    pub fn rows_written(&self) -> usize {
        self.index
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn number(value: Option<f64>) -> String {
    value
        .map(|v| format_general(v, DECIMAL_SEPARATOR))
        .unwrap_or_default()
}

/// Write every row to a new file at `path`, replacing any existing one.
pub fn export_to_path(path: impl AsRef<Path>, rows: &[DataRow]) -> Result<(), TraceError> {
    let path = path.as_ref();
    let mut export = CsvExport::new(BufWriter::new(File::create(path)?))?;
    for row in rows {
        export.write_row(row)?;
    }
    let written = export.rows_written();
    export.finish()?;
    info!("exported {written} rows to {}", path.display());
    Ok(())
}
