//! CSV reader for challan exports

use super::{non_empty, normalize_headers, IngestError, Sheet};
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read a CSV export
///
/// The first `skip_lines` physical lines are the report preamble; the next
/// record is the header. Records with more fields than the header are
/// skipped, shorter ones are padded with empty cells.
pub fn read_csv(content: &[u8], skip_lines: usize) -> Result<Sheet, IngestError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let body = skip_physical_lines(content, skip_lines);

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Ok(Sheet::default()),
    };
    let columns = normalize_headers(header.iter().map(str::to_string).collect());

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in records {
        let record = record?;
        if record.len() > columns.len() {
            skipped += 1;
            continue;
        }
        let mut row: Vec<Option<String>> =
            record.iter().map(|v| non_empty(v.to_string())).collect();
        row.resize(columns.len(), None);
        rows.push(row);
    }

    if skipped > 0 {
        debug!(skipped, "Skipped CSV lines with too many fields");
    }

    Ok(Sheet { columns, rows })
}

fn skip_physical_lines(content: &[u8], lines: usize) -> &[u8] {
    let mut rest = content;
    for _ in 0..lines {
        match rest.iter().position(|&b| b == b'\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return &[],
        }
    }
    rest
}
