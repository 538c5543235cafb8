//! Dataset files.
//!
//! Two formats:
//!
//! - counts JSON: `{"exp_y_values": [...], "x_values": [...]}` where `x_values`
//!   may be omitted and supplied as a grid instead; errors come from counting
//!   statistics
//! - dataset CSV: header `x,y,sigma`, one observation per row
//!
//! The reader/writer functions work on any `Read`/`Write`; the `*_file`
//! wrappers add the path to the error message for the CLI.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Dataset;
use crate::error::{AppError, FitError, Result};

/// Cached experiment counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountsFile {
    pub exp_y_values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_values: Option<Vec<f64>>,
}

impl CountsFile {
    /// Build a dataset with `sigma = max(sqrt(y), sigma_floor)`.
    ///
    /// `fallback_x` is used only when the file carries no `x_values`.
    pub fn to_dataset(&self, fallback_x: Option<&[f64]>, sigma_floor: f64) -> Result<Dataset> {
        let x = match (&self.x_values, fallback_x) {
            (Some(x), _) => x.clone(),
            (None, Some(x)) => x.to_vec(),
            (None, None) => {
                return Err(FitError::InvalidConfig(
                    "counts file has no x_values and no x grid was given".to_string(),
                ));
            }
        };
        Dataset::with_counting_errors(x, self.exp_y_values.clone(), sigma_floor)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DatasetRow {
    x: f64,
    y: f64,
    sigma: f64,
}

pub fn read_counts_json<R: Read>(reader: R) -> Result<CountsFile> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_counts_json<W: Write>(writer: W, counts: &CountsFile) -> Result<()> {
    serde_json::to_writer_pretty(writer, counts)?;
    Ok(())
}

pub fn read_dataset_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut sigma = Vec::new();
    for row in reader.deserialize() {
        let row: DatasetRow = row?;
        x.push(row.x);
        y.push(row.y);
        sigma.push(row.sigma);
    }
    Dataset::new(x, y, sigma)
}

pub fn write_dataset_csv<W: Write>(writer: W, dataset: &Dataset) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for i in 0..dataset.len() {
        writer.serialize(DatasetRow {
            x: dataset.x()[i],
            y: dataset.y()[i],
            sigma: dataset.sigma()[i],
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a counts JSON file.
pub fn read_counts_file(path: &Path) -> std::result::Result<CountsFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open counts JSON '{}': {e}", path.display())))?;
    read_counts_json(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid counts JSON '{}': {e}", path.display())))
}

/// Write a counts JSON file.
pub fn write_counts_file(path: &Path, counts: &CountsFile) -> std::result::Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create counts JSON '{}': {e}", path.display())))?;
    write_counts_json(BufWriter::new(file), counts)
        .map_err(|e| AppError::new(2, format!("Failed to write counts JSON '{}': {e}", path.display())))
}

/// Read a dataset CSV file. Validation failures keep their own exit code.
pub fn read_dataset_file(path: &Path) -> std::result::Result<Dataset, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open dataset CSV '{}': {e}", path.display())))?;
    read_dataset_csv(BufReader::new(file))
        .map_err(|e| AppError::new(e.exit_code(), format!("Dataset CSV '{}': {e}", path.display())))
}

/// Write a dataset CSV file.
pub fn write_dataset_file(path: &Path, dataset: &Dataset) -> std::result::Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dataset CSV '{}': {e}", path.display())))?;
    write_dataset_csv(BufWriter::new(file), dataset)
        .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV '{}': {e}", path.display())))
}
