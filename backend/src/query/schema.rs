//! Table descriptions handed to the language model

use crate::db::tables::{self, ColumnInfo, BOOKKEEPING_COLUMNS};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::fmt::Write;

const SAMPLE_ROWS: i64 = 3;
const SAMPLE_VALUE_CHARS: usize = 100;

/// What the model needs to know about a data table
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Data table name
    pub table_name: String,
    /// Uploaded columns, bookkeeping columns excluded
    pub columns: Vec<ColumnInfo>,
    /// First rows of the table
    pub samples: Vec<Map<String, Value>>,
    /// Number of stored rows
    pub total_rows: i64,
}

impl TableSchema {
    /// Inspect a data table
    pub async fn describe(pool: &SqlitePool, table_name: &str) -> Result<Self, sqlx::Error> {
        let columns = tables::column_info(pool, table_name)
            .await?
            .into_iter()
            .filter(|c| !BOOKKEEPING_COLUMNS.contains(&c.name.as_str()))
            .collect();
        let samples = tables::sample_rows(pool, table_name, SAMPLE_ROWS).await?;
        let total_rows = tables::count_rows(pool, table_name).await?;

        Ok(Self {
            table_name: table_name.to_string(),
            columns,
            samples,
            total_rows,
        })
    }

    /// Plain text rendering used inside prompts
    pub fn render(&self) -> String {
        let mut out = format!("Table: {}\n\nColumns and Data Types:\n", self.table_name);
        for column in &self.columns {
            let _ = writeln!(out, "- {} ({})", column.name, column.declared_type);
        }

        if !self.samples.is_empty() {
            let _ = write!(
                out,
                "\nSample Data (showing {} rows):\n",
                self.samples.len()
            );
            for (idx, row) in self.samples.iter().enumerate() {
                let _ = write!(out, "\nRow {}:\n", idx + 1);
                for (key, value) in row {
                    if BOOKKEEPING_COLUMNS.contains(&key.as_str()) {
                        continue;
                    }
                    let _ = writeln!(out, "  {}: {}", key, display_value(value));
                }
            }
        }

        let _ = write!(out, "\nTotal Records: {}\n", self.total_rows);
        out
    }
}

/// Describe a table, degrading to a one-line note if inspection fails
pub async fn describe_for_prompt(pool: &SqlitePool, table_name: &str) -> String {
    match TableSchema::describe(pool, table_name).await {
        Ok(schema) => schema.render(),
        Err(e) => {
            tracing::warn!(table = %table_name, error = %e, "Failed to describe table");
            format!("Table: {}\n(Error getting schema: {})", table_name, e)
        }
    }
}

fn display_value(value: &Value) -> String {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > SAMPLE_VALUE_CHARS {
        let cut: String = text.chars().take(SAMPLE_VALUE_CHARS).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_describe_and_render() {
        let db = Database::in_memory().await.unwrap();
        let columns = vec!["challan_place".to_string(), "offences".to_string()];
        let long = "x".repeat(150);
        let rows: Vec<Vec<Option<String>>> = (0..5)
            .map(|i| vec![Some(format!("Place {}", i)), Some(long.clone())])
            .collect();

        let mut tx = db.pool().begin().await.unwrap();
        tables::create_table(&mut tx, "excel_demo", &columns)
            .await
            .unwrap();
        tables::insert_rows(&mut tx, "excel_demo", &columns, &rows)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let schema = TableSchema::describe(db.pool(), "excel_demo").await.unwrap();
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.samples.len(), 3);
        assert_eq!(schema.total_rows, 5);

        let text = schema.render();
        assert!(text.starts_with("Table: excel_demo\n"));
        assert!(text.contains("- challan_place (TEXT)"));
        assert!(text.contains("Sample Data (showing 3 rows)"));
        assert!(text.contains(&format!("  offences: {}...", "x".repeat(100))));
        assert!(!text.contains("  id: "));
        assert!(text.contains("Total Records: 5"));
    }

    #[tokio::test]
    async fn test_missing_table_degrades() {
        let db = Database::in_memory().await.unwrap();
        let text = describe_for_prompt(db.pool(), "excel_missing").await;
        assert!(text.starts_with("Table: excel_missing\n(Error getting schema:"));
    }
}
