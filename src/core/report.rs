// src/core/report.rs

//! Writers for the files a run can leave behind: pretty JSON, CSV with a fixed
//! column set, and plain-text reports.

use serde::{Serialize, de::DeserializeOwned};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Why a report could not be written or read back.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Opening, writing or reading the file failed.
    #[error("Could not write '{path}': {source}")]
    Io {
        /// The report file.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// JSON encoding or decoding failed.
    #[error("Could not serialize report to JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The CSV writer failed.
    #[error("Could not write CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl ReportError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// The file formats a listing can be saved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `--save-json`
    Json,
    /// `--save-csv`
    Csv,
    /// `--save-text`
    Text,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        }
    }

    /// The word used in "saved to ..." messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON file",
            Self::Csv => "CSV file",
            Self::Text => "text file",
        }
    }
}

/// The format chosen on the command line, plus the file name if one was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Which writer to use.
    pub format: OutputFormat,
    /// `None` means a generated name.
    pub path: Option<PathBuf>,
}

/// A record with a fixed CSV column set.
pub trait CsvRecord {
    /// Column names, in order.
    const HEADERS: &'static [&'static str];

    /// One cell per entry of [`CsvRecord::HEADERS`], in the same order.
    fn csv_row(&self) -> Vec<String>;
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|e| ReportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| ReportError::io(path, e))?;
    Ok(())
}

/// Reads back a JSON report.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ReportError> {
    let content = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Writes `records` as CSV with a header row.
pub fn write_csv<T: CsvRecord>(path: &Path, records: &[T]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(T::HEADERS)?;
    for record in records {
        writer.write_record(record.csv_row())?;
    }
    writer.flush().map_err(|e| ReportError::io(path, e))?;
    Ok(())
}

/// Writes an already rendered text report.
pub fn write_text(path: &Path, content: &str) -> Result<(), ReportError> {
    fs::write(path, content).map_err(|e| ReportError::io(path, e))
}
