//! Spreadsheet ingestion
//!
//! Turns an uploaded CSV or Excel file into a [`Sheet`]: a header row plus
//! string cells, ready to be stored as a data table.

pub mod challan;
pub mod csv;
pub mod excel;
pub mod sanitize;

pub use sanitize::{sanitize_column_name, sanitize_columns, sanitize_table_name};

use std::path::Path;
use thiserror::Error;

/// Errors raised while reading an uploaded file
#[derive(Error, Debug)]
pub enum IngestError {
    /// Extension is not one of .xlsx, .xls or .csv
    #[error("File must be an Excel file (.xlsx or .xls) or CSV file (.csv)")]
    UnsupportedFormat,

    /// No data rows or no columns survived processing
    #[error("File is empty after processing")]
    Empty,

    /// CSV could not be parsed
    #[error("Error processing file: {0}")]
    Csv(#[from] ::csv::Error),

    /// Workbook could not be opened or has no worksheet
    #[error("Error processing file: {0}")]
    Excel(String),
}

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.csv`
    Csv,
    /// `.xlsx` or `.xls`
    Excel,
}

impl FileFormat {
    /// Detect the format from a file name, ignoring case
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// Parsed tabular content of an upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    /// Header names, in file order
    pub columns: Vec<String>,
    /// Cells per row; `None` is an empty cell
    pub rows: Vec<Vec<Option<String>>>,
}

impl Sheet {
    /// Keep only the named columns, in the given order
    pub fn select(&self, names: &[&str]) -> Sheet {
        let indexes: Vec<usize> = names
            .iter()
            .filter_map(|name| self.columns.iter().position(|c| c == name))
            .collect();

        Sheet {
            columns: indexes.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| {
                    indexes
                        .iter()
                        .map(|&i| row.get(i).cloned().flatten())
                        .collect()
                })
                .collect(),
        }
    }

    /// Drop rows where every cell is empty
    pub fn drop_empty_rows(&mut self) {
        self.rows.retain(|row| row.iter().any(Option::is_some));
    }

    /// Fail with [`IngestError::Empty`] when nothing is left to store
    pub fn ensure_not_empty(self) -> Result<Self, IngestError> {
        if self.columns.is_empty() || self.rows.is_empty() {
            Err(IngestError::Empty)
        } else {
            Ok(self)
        }
    }
}

/// Parse an uploaded file
///
/// # Arguments
/// * `filename` - original file name, used to pick the format
/// * `content` - raw file bytes
/// * `csv_skip_rows` - preamble lines before the CSV header
pub fn parse_upload(
    filename: &str,
    content: &[u8],
    csv_skip_rows: usize,
) -> Result<Sheet, IngestError> {
    let format = FileFormat::from_filename(filename).ok_or(IngestError::UnsupportedFormat)?;

    let mut sheet = match format {
        FileFormat::Csv => {
            let raw = csv::read_csv(content, csv_skip_rows)?;
            challan::select_required(&raw)
        }
        FileFormat::Excel => excel::read_first_sheet(content)?,
    };

    sheet.drop_empty_rows();
    sheet.ensure_not_empty()
}

/// Fill blank header cells and disambiguate repeated names
///
/// Blank cells become `Unnamed: {index}`; a repeated name gets `.1`, `.2`, ...
pub(crate) fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(raw.len());
    for (i, name) in raw.into_iter().enumerate() {
        let name = name.trim().to_string();
        let base = if name.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name
        };

        let mut candidate = base.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }
        seen.push(candidate);
    }
    seen
}

/// Map empty strings to `None`
pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
