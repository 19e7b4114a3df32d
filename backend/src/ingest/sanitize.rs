//! SQL-safe table and column names

use crate::db::tables::BOOKKEEPING_COLUMNS;

const MAX_NAME_LEN: usize = 64;

fn sanitize(name: &str, prefix: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut sanitized = replaced.trim_matches('_').to_string();
    if let Some(first) = sanitized.chars().next() {
        if !first.is_ascii_alphabetic() {
            sanitized = format!("{}{}", prefix, sanitized);
        }
    }

    sanitized.truncate(MAX_NAME_LEN);
    sanitized.to_lowercase()
}

/// Sanitize a file stem for use in a table name
pub fn sanitize_table_name(name: &str) -> String {
    sanitize(name, "tbl_")
}

/// Sanitize a header for use as a column name
pub fn sanitize_column_name(name: &str) -> String {
    sanitize(name, "col_")
}

/// Sanitize every header, keeping the results unique
///
/// Headers that sanitize to nothing become `col_{index}`; clashes with each
/// other or with the bookkeeping columns get `_2`, `_3`, ... appended.
pub fn sanitize_columns(columns: &[String]) -> Vec<String> {
    let mut taken: Vec<String> = BOOKKEEPING_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut result = Vec::with_capacity(columns.len());

    for (i, column) in columns.iter().enumerate() {
        let mut base = sanitize_column_name(column);
        if base.is_empty() {
            base = format!("col_{}", i);
        }

        let mut candidate = base.clone();
        let mut n = 2;
        while taken.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        taken.push(candidate.clone());
        result.push(candidate);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_column_name() {
        assert_eq!(sanitize_column_name("Challan Amount"), "challan_amount");
        assert_eq!(sanitize_column_name("Latitue Longtitue"), "latitue_longtitue");
        assert_eq!(sanitize_column_name("__Amount (₹)__"), "amount");
        assert_eq!(sanitize_column_name("2024 total"), "col_2024_total");
        assert_eq!(sanitize_column_name("***"), "");
    }

    #[test]
    fn test_sanitize_table_name() {
        assert_eq!(sanitize_table_name("Challan Report-Jan"), "challan_report_jan");
        assert_eq!(sanitize_table_name("2024 data"), "tbl_2024_data");
        let long = "a".repeat(100);
        assert_eq!(sanitize_table_name(&long).len(), 64);
    }

    #[test]
    fn test_sanitize_columns_deduplicates() {
        let columns: Vec<String> = vec!["Amount", "amount", "", "ID", "Amount!"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            sanitize_columns(&columns),
            vec!["amount", "amount_2", "col_2", "id_2", "amount_3"]
        );
    }
}
