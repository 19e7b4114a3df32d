//! Upload record queries

use super::models::Upload;
use sqlx::{Sqlite, SqlitePool};

const UPLOAD_COLUMNS: &str =
    "id, user_id, filename, table_name, columns, row_count, created_at, updated_at";

/// Insert an upload record
pub async fn insert<'c, E>(executor: E, upload: &Upload) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO excel_uploads (id, user_id, filename, table_name, columns, row_count, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&upload.id)
    .bind(&upload.user_id)
    .bind(&upload.filename)
    .bind(&upload.table_name)
    .bind(&upload.columns)
    .bind(upload.row_count)
    .bind(upload.created_at)
    .bind(upload.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// All uploads of a user, newest first
pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Upload>, sqlx::Error> {
    sqlx::query_as::<_, Upload>(&format!(
        "SELECT {} FROM excel_uploads WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        UPLOAD_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// The user's most recent upload
pub async fn latest_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<Upload>, sqlx::Error> {
    sqlx::query_as::<_, Upload>(&format!(
        "SELECT {} FROM excel_uploads WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
        UPLOAD_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// An upload by id, only if owned by `user_id`
pub async fn find_for_user(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<Upload>, sqlx::Error> {
    sqlx::query_as::<_, Upload>(&format!(
        "SELECT {} FROM excel_uploads WHERE id = ? AND user_id = ?",
        UPLOAD_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// An upload by table name, only if owned by `user_id`
pub async fn find_by_table_for_user(
    pool: &SqlitePool,
    table_name: &str,
    user_id: &str,
) -> Result<Option<Upload>, sqlx::Error> {
    sqlx::query_as::<_, Upload>(&format!(
        "SELECT {} FROM excel_uploads WHERE table_name = ? AND user_id = ?",
        UPLOAD_COLUMNS
    ))
    .bind(table_name)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Delete an upload record
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM excel_uploads WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
