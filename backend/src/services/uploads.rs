//! Upload service
//!
//! Stores uploaded spreadsheets as per-user data tables and manages the
//! upload records that point at them.

use crate::db::{tables, uploads, FileInfo, Upload};
use crate::error::AppError;
use crate::ingest::{self, sanitize_columns, sanitize_table_name};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Result of storing an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadData {
    /// Data table holding the rows
    pub table_name: String,
    /// Rows left after parsing
    pub rows_processed: usize,
    /// Rows inserted
    pub rows_stored: u64,
    /// Original column names, in file order
    pub columns: Vec<String>,
}

/// The caller's uploads, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileList {
    /// Uploads, newest first
    pub files: Vec<FileInfo>,
    /// Number of uploads
    pub total_count: usize,
}

/// Outcome of deleting an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedFile {
    /// Id of the removed upload
    pub file_id: String,
    /// Original file name
    pub filename: String,
    /// Dropped data table
    pub table_name: String,
    /// Whether the data table was dropped; the record is removed either way
    pub table_dropped: bool,
}

/// Upload service
#[derive(Clone)]
pub struct UploadService {
    pool: SqlitePool,
    csv_skip_rows: usize,
}

impl UploadService {
    /// Upload service; `csv_skip_rows` lines precede CSV headers
    pub fn new(pool: SqlitePool, csv_skip_rows: usize) -> Self {
        Self {
            pool,
            csv_skip_rows,
        }
    }

    /// Parse an uploaded file and store its rows in a new table
    pub async fn upload(
        &self,
        user_id: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<UploadData, AppError> {
        let skip = self.csv_skip_rows;
        let name = filename.to_string();
        let sheet =
            tokio::task::spawn_blocking(move || ingest::parse_upload(&name, &content, skip))
                .await
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Upload parser failed: {}", e)))??;

        let stored_columns = sanitize_columns(&sheet.columns);

        let mut tx = self.pool.begin().await?;
        let table_name =
            create_unique_table(&mut tx, &base_table_name(filename), &stored_columns).await?;
        let rows_stored =
            tables::insert_rows(&mut tx, &table_name, &stored_columns, &sheet.rows).await?;

        let record = Upload::new(
            user_id.to_string(),
            filename.to_string(),
            table_name.clone(),
            sheet.columns.clone(),
            rows_stored as i64,
        );
        uploads::insert(&mut *tx, &record).await?;
        tx.commit().await?;

        info!(
            table = %table_name,
            rows = rows_stored,
            columns = sheet.columns.len(),
            "Stored upload"
        );

        Ok(UploadData {
            table_name,
            rows_processed: sheet.rows.len(),
            rows_stored,
            columns: sheet.columns,
        })
    }

    /// All uploads of a user, newest first
    pub async fn list(&self, user_id: &str) -> Result<FileList, AppError> {
        let files: Vec<FileInfo> = uploads::list_for_user(&self.pool, user_id)
            .await?
            .into_iter()
            .map(FileInfo::from)
            .collect();
        Ok(FileList {
            total_count: files.len(),
            files,
        })
    }

    /// Delete an upload owned by `user_id` together with its table
    pub async fn delete(&self, user_id: &str, file_id: &str) -> Result<DeletedFile, AppError> {
        let upload = uploads::find_for_user(&self.pool, file_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(
                    "File not found or you don't have permission to delete it".to_string(),
                )
            })?;

        let table_dropped = match tables::drop_table(&self.pool, &upload.table_name).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    table = %upload.table_name,
                    error = %e,
                    "Failed to drop table, removing upload record anyway"
                );
                false
            }
        };

        uploads::delete(&self.pool, &upload.id).await?;

        Ok(DeletedFile {
            file_id: upload.id,
            filename: upload.filename,
            table_name: upload.table_name,
            table_dropped,
        })
    }

    /// Resolve the table a query should run against
    ///
    /// A named table must belong to the caller; otherwise the latest upload
    /// is used.
    pub async fn resolve_table(
        &self,
        user_id: &str,
        table_name: Option<&str>,
    ) -> Result<String, AppError> {
        match table_name.map(str::trim).filter(|t| !t.is_empty()) {
            Some(name) => uploads::find_by_table_for_user(&self.pool, name, user_id)
                .await?
                .map(|u| u.table_name)
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "Table '{}' not found or you don't have permission to access it. \
                         Please upload a file first or select a valid file.",
                        name
                    ))
                }),
            None => uploads::latest_for_user(&self.pool, user_id)
                .await?
                .map(|u| u.table_name)
                .ok_or_else(|| {
                    AppError::NotFound(
                        "No Excel file has been uploaded yet. Please upload an Excel file first."
                            .to_string(),
                    )
                }),
        }
    }
}

/// `excel_{stem}_{timestamp}`
fn base_table_name(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    format!(
        "excel_{}_{}",
        sanitize_table_name(stem),
        Utc::now().format("%Y%m%d_%H%M%S")
    )
}

/// Create the data table as `base`, or `base_2`, `base_3`, ... when taken
///
/// Runs inside the upload transaction. A name claimed between the existence
/// check and the create moves on to the next suffix.
async fn create_unique_table(
    conn: &mut SqliteConnection,
    base: &str,
    columns: &[String],
) -> Result<String, AppError> {
    let mut candidate = base.to_string();
    let mut n = 2;
    loop {
        if !tables::table_exists(&mut *conn, &candidate).await? {
            match tables::create_table(&mut *conn, &candidate, columns).await {
                Ok(()) => return Ok(candidate),
                Err(e) if tables::is_name_taken(&e) => {
                    warn!(table = %candidate, "Table name claimed concurrently, trying the next one");
                }
                Err(e) => return Err(e.into()),
            }
        }
        candidate = format!("{}_{}", base, n);
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{users, Database};

    const CSV: &str = "Challan Report\n\
                       District: Indore\n\
                       Challan Number,Challan Amount,Challan Place,Remarks\n\
                       CH-1,500,Vijay Nagar,x\n\
                       CH-2,1500,Palasia,y\n\
                       ,,,\n";

    const WORKBOOK: &[u8] = include_bytes!("../../tests/fixtures/challans.xlsx");

    async fn setup() -> (UploadService, Database, String) {
        let db = Database::in_memory().await.unwrap();
        let user = users::upsert_otp(db.pool(), "a@example.com", "111111", Utc::now())
            .await
            .unwrap();
        (UploadService::new(db.pool().clone(), 2), db, user.id)
    }

    #[tokio::test]
    async fn test_upload_stores_challan_columns() {
        let (service, db, user_id) = setup().await;
        let data = service
            .upload(&user_id, "Jan Report.csv", CSV.as_bytes().to_vec())
            .await
            .unwrap();

        assert!(data.table_name.starts_with("excel_jan_report_"));
        assert_eq!(
            data.columns,
            vec!["Challan Number", "Challan Place", "Challan Amount"]
        );
        assert_eq!(data.rows_processed, 2);
        assert_eq!(data.rows_stored, 2);

        let rows = tables::execute_select(
            db.pool(),
            &format!(
                "SELECT challan_number, challan_amount FROM \"{}\" ORDER BY challan_number",
                data.table_name
            ),
        )
        .await
        .unwrap();
        assert_eq!(rows[1]["challan_amount"], "1500");
    }

    #[tokio::test]
    async fn test_same_second_uploads_get_distinct_tables() {
        let (service, _db, user_id) = setup().await;
        let first = service
            .upload(&user_id, "r.csv", CSV.as_bytes().to_vec())
            .await
            .unwrap();
        let second = service
            .upload(&user_id, "r.csv", CSV.as_bytes().to_vec())
            .await
            .unwrap();
        assert_ne!(first.table_name, second.table_name);

        let listing = service.list(&user_id).await.unwrap();
        assert_eq!(listing.total_count, 2);
        assert_eq!(listing.files[0].table_name, second.table_name);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_of_one_file() {
        let (service, _db, user_id) = setup().await;
        let (first, second) = tokio::join!(
            service.upload(&user_id, "r.csv", CSV.as_bytes().to_vec()),
            service.upload(&user_id, "r.csv", CSV.as_bytes().to_vec()),
        );
        assert_ne!(first.unwrap().table_name, second.unwrap().table_name);
    }

    #[tokio::test]
    async fn test_unique_table_skips_taken_names() {
        let (_service, db, _user_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let columns = vec!["challan_number".to_string()];
        tables::create_table(&mut conn, "excel_r_20240105_103000", &columns)
            .await
            .unwrap();
        tables::create_table(&mut conn, "excel_r_20240105_103000_2", &columns)
            .await
            .unwrap();

        let name = create_unique_table(&mut conn, "excel_r_20240105_103000", &columns)
            .await
            .unwrap();
        assert_eq!(name, "excel_r_20240105_103000_3");
    }

    #[tokio::test]
    async fn test_excel_upload() {
        let (service, db, user_id) = setup().await;
        let data = service
            .upload(&user_id, "challans.xlsx", WORKBOOK.to_vec())
            .await
            .unwrap();

        assert!(data.table_name.starts_with("excel_challans_"));
        assert_eq!(
            data.columns,
            vec!["Challan Number", "Unnamed: 1", "Challan Date", "Challan Amount"]
        );
        assert_eq!(data.rows_stored, 2);

        let rows = tables::execute_select(
            db.pool(),
            &format!(
                "SELECT challan_number, challan_date, challan_amount FROM \"{}\" ORDER BY challan_number",
                data.table_name
            ),
        )
        .await
        .unwrap();
        assert_eq!(rows[0]["challan_date"], "2024-01-05T10:30:00");
        assert_eq!(rows[0]["challan_amount"], "500");
        assert!(rows[1]["challan_date"].is_null());
    }

    #[tokio::test]
    async fn test_rejected_uploads() {
        let (service, _db, user_id) = setup().await;
        let err = service
            .upload(&user_id, "notes.txt", b"hi".to_vec())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "File must be an Excel file (.xlsx or .xls) or CSV file (.csv)"
        );

        let err = service
            .upload(&user_id, "empty.csv", b"a\nb\n".to_vec())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "File is empty after processing");
    }

    #[tokio::test]
    async fn test_delete_checks_ownership_and_drops_table() {
        let (service, db, user_id) = setup().await;
        let data = service
            .upload(&user_id, "r.csv", CSV.as_bytes().to_vec())
            .await
            .unwrap();
        let file_id = service.list(&user_id).await.unwrap().files[0].id.clone();

        let err = service.delete("intruder", &file_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let deleted = service.delete(&user_id, &file_id).await.unwrap();
        assert!(deleted.table_dropped);
        assert_eq!(deleted.filename, "r.csv");
        assert!(!tables::table_exists(db.pool(), &data.table_name).await.unwrap());
        assert_eq!(service.list(&user_id).await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn test_resolve_table() {
        let (service, _db, user_id) = setup().await;
        let err = service.resolve_table(&user_id, None).await.unwrap_err();
        assert!(err.to_string().starts_with("No Excel file has been uploaded yet"));

        let data = service
            .upload(&user_id, "r.csv", CSV.as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(
            service.resolve_table(&user_id, None).await.unwrap(),
            data.table_name
        );
        assert_eq!(
            service
                .resolve_table(&user_id, Some(&data.table_name))
                .await
                .unwrap(),
            data.table_name
        );

        let err = service
            .resolve_table("intruder", Some(&data.table_name))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with(&format!("Table '{}' not found", data.table_name)));
    }
}
