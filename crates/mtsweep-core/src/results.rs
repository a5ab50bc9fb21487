//! Results file output.
//!
//! One comma-separated line per schedule point:
//! `rmse,mae,meanWallClockMicros,requestedTrials`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, SweepError};
use crate::stats::ScaleRecord;

/// Format one record as a CSV line, newline included.
pub fn format_record(record: &ScaleRecord) -> String {
    format!(
        "{},{},{},{}\n",
        record.rmse, record.mae, record.mean_wall_clock_micros, record.requested_trials
    )
}

/// Write records to any writer.
pub fn write_records<W: Write>(mut writer: W, records: &[ScaleRecord]) -> std::io::Result<()> {
    for record in records {
        writer.write_all(format_record(record).as_bytes())?;
    }
    writer.flush()
}

/// Write records to `path`, creating missing parent directories.
pub fn write_results(path: impl AsRef<Path>, records: &[ScaleRecord]) -> Result<()> {
    let path = path.as_ref();
    let to_error = |source| SweepError::OutputWriteFailed {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    let file = File::create(path).map_err(to_error)?;
    write_records(BufWriter::new(file), records).map_err(to_error)?;

    tracing::info!(path = %path.display(), records = records.len(), "Results written");
    Ok(())
}
