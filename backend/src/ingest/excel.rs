//! Excel reader

use super::{non_empty, normalize_headers, IngestError, Sheet};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

/// Read the first worksheet; its first row is the header
pub fn read_first_sheet(content: &[u8]) -> Result<Sheet, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec()))
        .map_err(|e| IngestError::Excel(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Excel("workbook has no worksheets".to_string()))?
        .map_err(|e| IngestError::Excel(e.to_string()))?;

    let mut rows = range.rows();
    let header = match rows.next() {
        Some(cells) => cells
            .iter()
            .map(|c| cell_to_string(c).unwrap_or_default())
            .collect(),
        None => return Ok(Sheet::default()),
    };
    let columns = normalize_headers(header);

    let rows = rows
        .map(|cells| {
            let mut row: Vec<Option<String>> = cells.iter().map(cell_to_string).collect();
            row.resize(columns.len(), None);
            row
        })
        .collect();

    Ok(Sheet { columns, rows })
}

/// Text form of a cell; errors and blanks are `None`
pub fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => non_empty(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(match dt.as_datetime() {
            Some(naive) => naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => format_float(dt.as_f64()),
        }),
        Data::DateTimeIso(s) | Data::DurationIso(s) => non_empty(s.clone()),
    }
}

/// Integral values print without a fraction
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
