//! Persistent records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A registered user
#[derive(Debug, Clone, FromRow)]
pub struct User {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Login email
    pub email: Option<String>,
    /// Full name
    pub name: Option<String>,
    /// Department
    pub department: Option<String>,
    /// Designation
    pub designation: Option<String>,
    /// Six digit MPIN, once generated
    pub mpin: Option<String>,
    /// Pending one-time password
    pub otp: Option<String>,
    /// When the pending OTP was issued
    pub otp_created_at: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a user with only an email set
    pub fn new(email: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: Some(email),
            name: None,
            department: None,
            designation: None,
            mpin: None,
            otp: None,
            otp_created_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New full name
    pub name: Option<String>,
    /// New department
    pub department: Option<String>,
    /// New designation
    pub designation: Option<String>,
}

/// An uploaded spreadsheet and the table holding its rows
#[derive(Debug, Clone, FromRow)]
pub struct Upload {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Original file name
    pub filename: String,
    /// Name of the data table
    pub table_name: String,
    /// Original column names, in file order
    pub columns: Json<Vec<String>>,
    /// Number of stored rows
    pub row_count: i64,
    /// Upload time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Upload {
    /// Create a record for a freshly stored table
    pub fn new(
        user_id: String,
        filename: String,
        table_name: String,
        columns: Vec<String>,
        row_count: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            filename,
            table_name,
            columns: Json(columns),
            row_count,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Upload listing entry returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// Upload record id
    pub id: String,
    /// Original file name
    pub filename: String,
    /// Data table name
    pub table_name: String,
    /// Column names
    pub columns: Vec<String>,
    /// Stored row count
    pub row_count: i64,
    /// Upload time (ISO-8601)
    pub created_at: String,
    /// Last update time (ISO-8601)
    pub updated_at: String,
}

impl From<Upload> for FileInfo {
    fn from(upload: Upload) -> Self {
        Self {
            id: upload.id,
            filename: upload.filename,
            table_name: upload.table_name,
            columns: upload.columns.0,
            row_count: upload.row_count,
            created_at: upload.created_at.to_rfc3339(),
            updated_at: upload.updated_at.to_rfc3339(),
        }
    }
}
