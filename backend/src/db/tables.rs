//! Per-upload data tables
//!
//! Every upload gets its own table. Column names come from user files, so
//! they are always passed through [`quote_ident`] and row values are always
//! bound, never interpolated.

use serde_json::{Map, Number, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, Sqlite, SqliteConnection, SqlitePool, TypeInfo, ValueRef};

/// Columns every data table carries besides the uploaded ones
pub const BOOKKEEPING_COLUMNS: &[&str] = &["id", "created_at", "updated_at"];

/// A column name and its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Type from the CREATE TABLE statement
    pub declared_type: String,
}

/// Quote an identifier for SQLite
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create a data table with one TEXT column per entry in `columns`
pub async fn create_table(
    conn: &mut SqliteConnection,
    table_name: &str,
    columns: &[String],
) -> Result<(), sqlx::Error> {
    let mut defs = vec!["id TEXT PRIMARY KEY".to_string()];
    defs.extend(columns.iter().map(|c| format!("{} TEXT", quote_ident(c))));
    defs.push("created_at TEXT DEFAULT CURRENT_TIMESTAMP".to_string());
    defs.push("updated_at TEXT DEFAULT CURRENT_TIMESTAMP".to_string());

    let sql = format!(
        "CREATE TABLE {} ({})",
        quote_ident(table_name),
        defs.join(", ")
    );
    sqlx::query(&sql).execute(conn).await?;
    Ok(())
}

/// Insert rows, each cell bound as TEXT or NULL
///
/// Returns the number of inserted rows.
pub async fn insert_rows(
    conn: &mut SqliteConnection,
    table_name: &str,
    columns: &[String],
    rows: &[Vec<Option<String>>],
) -> Result<u64, sqlx::Error> {
    let mut names = vec!["id".to_string()];
    names.extend(columns.iter().map(|c| quote_ident(c)));
    let placeholders = vec!["?"; names.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table_name),
        names.join(", "),
        placeholders
    );

    let mut inserted = 0;
    for row in rows {
        let mut query = sqlx::query(&sql).bind(uuid::Uuid::new_v4().to_string());
        for i in 0..columns.len() {
            query = query.bind(row.get(i).cloned().flatten());
        }
        inserted += query.execute(&mut *conn).await?.rows_affected();
    }
    Ok(inserted)
}

/// Drop a data table if it exists
pub async fn drop_table(pool: &SqlitePool, table_name: &str) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table_name)))
        .execute(pool)
        .await?;
    Ok(())
}

/// Whether a table with this name exists
pub async fn table_exists<'c, E>(executor: E, table_name: &str) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table_name)
            .fetch_one(executor)
            .await?;
    Ok(count > 0)
}

/// Whether `CREATE TABLE` failed because the name is taken
pub fn is_name_taken(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.message().contains("already exists"))
}

/// Declared columns of a table, in definition order
pub async fn column_info(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<Vec<ColumnInfo>, sqlx::Error> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
            .bind(table_name)
            .fetch_all(pool)
            .await?;
    Ok(rows
        .into_iter()
        .map(|(name, declared_type)| ColumnInfo {
            name,
            declared_type,
        })
        .collect())
}

/// First `limit` rows of a table
pub async fn sample_rows(
    pool: &SqlitePool,
    table_name: &str,
    limit: i64,
) -> Result<Vec<Map<String, Value>>, sqlx::Error> {
    let sql = format!("SELECT * FROM {} LIMIT ?", quote_ident(table_name));
    let rows = sqlx::query(&sql).bind(limit).fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

/// Number of rows in a table
pub async fn count_rows(pool: &SqlitePool, table_name: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(table_name)))
        .fetch_one(pool)
        .await
}

/// Run a read-only statement and return rows as ordered JSON objects
pub async fn execute_select(
    pool: &SqlitePool,
    sql: &str,
) -> Result<Vec<Map<String, Value>>, sqlx::Error> {
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

/// Convert a row using each value's storage class
pub fn row_to_json(row: &SqliteRow) -> Map<String, Value> {
    let mut map = Map::new();
    for column in row.columns() {
        let i = column.ordinal();
        map.insert(column.name().to_string(), cell_to_json(row, i));
    }
    map
}

fn cell_to_json(row: &SqliteRow, i: usize) -> Value {
    let storage = match row.try_get_raw(i) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    match storage.as_str() {
        "INTEGER" => row
            .try_get::<i64, _>(i)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get::<f64, _>(i)
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(i)
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(i)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn seeded() -> Database {
        let db = Database::in_memory().await.unwrap();
        let columns = vec!["challan_amount".to_string(), "challan_place".to_string()];
        let rows = vec![
            vec![Some("500".to_string()), Some("Vijay Nagar".to_string())],
            vec![Some("1500".to_string()), None],
            vec![Some("250".to_string()), Some("Palasia".to_string())],
        ];

        let mut tx = db.pool().begin().await.unwrap();
        create_table(&mut tx, "excel_demo", &columns).await.unwrap();
        let inserted = insert_rows(&mut tx, "excel_demo", &columns, &rows)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(inserted, 3);
        db
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn test_create_insert_and_describe() {
        let db = seeded().await;
        let pool = db.pool();

        assert!(table_exists(pool, "excel_demo").await.unwrap());
        assert_eq!(count_rows(pool, "excel_demo").await.unwrap(), 3);

        let names: Vec<_> = column_info(pool, "excel_demo")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec!["id", "challan_amount", "challan_place", "created_at", "updated_at"]
        );

        let samples = sample_rows(pool, "excel_demo", 2).await.unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[tokio::test]
    async fn test_execute_select_maps_storage_classes() {
        let db = seeded().await;
        let rows = execute_select(
            db.pool(),
            "SELECT challan_place, COUNT(*) AS total, AVG(CAST(challan_amount AS REAL)) AS avg_amount \
             FROM excel_demo GROUP BY challan_place ORDER BY challan_place",
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 3);
        // NULL sorts first in SQLite
        assert!(rows[0]["challan_place"].is_null());
        assert_eq!(rows[1]["challan_place"], "Palasia");
        assert_eq!(rows[1]["total"], 1);
        assert_eq!(rows[1]["avg_amount"], 250.0);

        let keys: Vec<_> = rows[1].keys().cloned().collect();
        assert_eq!(keys, vec!["challan_place", "total", "avg_amount"]);
    }

    #[tokio::test]
    async fn test_name_taken_detection() {
        let db = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = create_table(&mut conn, "excel_demo", &["a".to_string()])
            .await
            .unwrap_err();
        assert!(is_name_taken(&err));
        drop(conn);

        let err = execute_select(db.pool(), "SELECT * FROM missing_table")
            .await
            .unwrap_err();
        assert!(!is_name_taken(&err));
    }

    #[tokio::test]
    async fn test_drop_table() {
        let db = seeded().await;
        drop_table(db.pool(), "excel_demo").await.unwrap();
        assert!(!table_exists(db.pool(), "excel_demo").await.unwrap());
        // Dropping again is a no-op
        drop_table(db.pool(), "excel_demo").await.unwrap();
    }
}
