//! Challan report columns

use super::Sheet;
use tracing::{info, warn};

/// Columns kept from a challan CSV export, in stored order
///
/// Spellings match the export headers exactly.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "Challan Number",
    "Challan Source",
    "Vehicle Number",
    "Challan Date",
    "Challan Place",
    "Latitue Longtitue",
    "Violator Name",
    "Violator Address",
    "Violator Contact",
    "Owner Name",
    "Challan Status",
    "Challan Amount",
    "Vehicle Class",
    "Send To Court Date",
    "Court Name",
    "Offences",
];

/// Reduce a parsed export to the challan columns it contains
pub fn select_required(sheet: &Sheet) -> Sheet {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| !sheet.columns.iter().any(|c| c == name))
        .collect();

    if !missing.is_empty() {
        warn!(missing = ?missing, "Missing columns in CSV");
        info!(available = ?sheet.columns, "Available columns");
    }

    sheet.select(REQUIRED_COLUMNS)
}
