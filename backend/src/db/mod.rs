//! Database access
//!
//! A single SQLite pool holds the user and upload tables plus one data table
//! per uploaded spreadsheet.

pub mod models;
pub mod tables;
pub mod uploads;
pub mod users;

pub use models::{FileInfo, ProfileUpdate, Upload, User};

use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const MIGRATIONS: &[(&str, &str)] = &[(
    "001_create_users_and_uploads",
    include_str!("../../migrations/001_create_users_and_uploads.sql"),
)];

/// Database connection pool
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database and run migrations
    ///
    /// # Arguments
    /// * `url` - `sqlite:` connection string or a plain file path
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::Internal(anyhow::anyhow!(
                            "Failed to create database directory: {}",
                            e
                        ))
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Connected to SQLite database at: {}", path);

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open a private in-memory database
    ///
    /// Limited to one connection; every connection to `:memory:` would
    /// otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // The database lives only as long as its single connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");

        for (name, sql) in MIGRATIONS {
            for statement in split_statements(sql) {
                sqlx::query(&statement)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| {
                        AppError::Internal(anyhow::anyhow!(
                            "Migration {} failed: {} - Statement: {}",
                            name,
                            e,
                            statement.chars().take(100).collect::<String>()
                        ))
                    })?;
            }
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Strip `--` comments and split a migration script into statements
fn split_statements(sql: &str) -> Vec<String> {
    let mut cleaned = String::new();
    for line in sql.lines() {
        let code = match line.find("--") {
            Some(pos) => &line[..pos],
            None => line,
        };
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        cleaned.push_str(code);
        cleaned.push(' ');
    }

    cleaned
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_split_statements_drops_comments() {
        let statements = split_statements(
            "-- heading\nCREATE TABLE a (x TEXT); -- trailing\n\nCREATE TABLE b (\n  y TEXT -- inline\n);\n",
        );
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (x TEXT)", "CREATE TABLE b ( y TEXT )"]
        );
    }

    #[tokio::test]
    async fn test_in_memory_runs_migrations() {
        let db = Database::in_memory().await.unwrap();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'excel_uploads')",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_connect_creates_file_and_parent_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("challan.db");
        let url = format!("sqlite:{}", path.display());

        let db = Database::connect(&url).await.unwrap();
        assert!(path.exists());

        // Reconnecting reruns the idempotent migrations.
        drop(db);
        Database::connect(&url).await.unwrap();
    }
}
