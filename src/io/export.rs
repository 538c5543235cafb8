//! Profile scan exports (CSV and JSON).
//!
//! The CSV is meant for spreadsheets and plotting scripts: one row per scan
//! point, failed points kept with an empty chi2 and the failure message.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{PointOutcome, ProfileScan};
use crate::error::{AppError, Result};

/// Write `scan` as CSV. `names` are the full model's parameter names.
pub fn write_profile_csv<W: Write>(mut out: W, scan: &ProfileScan, names: &[String]) -> Result<()> {
    write!(out, "fixed_value,chi2,status")?;
    for name in names {
        write!(out, ",{name}")?;
    }
    writeln!(out, ",message")?;

    for point in scan.points() {
        match point.outcome() {
            PointOutcome::Converged { chi2, parameters } => {
                write!(out, "{:.10},{:.10},converged", point.fixed_value(), chi2)?;
                for p in parameters {
                    write!(out, ",{p:.10}")?;
                }
                writeln!(out, ",")?;
            }
            PointOutcome::Failed { failure } => {
                write!(out, "{:.10},,failed", point.fixed_value())?;
                for _ in names {
                    write!(out, ",")?;
                }
                writeln!(out, ",\"{}\"", failure.to_string().replace('"', "'"))?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

pub fn write_profile_json<W: Write>(out: W, scan: &ProfileScan) -> Result<()> {
    serde_json::to_writer_pretty(out, scan)?;
    Ok(())
}

/// Write the scan to `path` as CSV.
pub fn write_profile_csv_file(path: &Path, scan: &ProfileScan, names: &[String]) -> std::result::Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_profile_csv(BufWriter::new(file), scan, names)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV '{}': {e}", path.display())))
}

/// Write the scan to `path` as JSON.
pub fn write_profile_json_file(path: &Path, scan: &ProfileScan) -> std::result::Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    write_profile_json(BufWriter::new(file), scan)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON '{}': {e}", path.display())))
}
