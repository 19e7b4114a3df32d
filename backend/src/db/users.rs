//! User queries

use super::models::{ProfileUpdate, User};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, email, name, department, designation, mpin, otp, otp_created_at, created_at, updated_at";

/// Look up a user by email
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Look up a user by id
pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Store a pending OTP, creating the user on first contact
pub async fn upsert_otp(
    pool: &SqlitePool,
    email: &str,
    otp: &str,
    now: DateTime<Utc>,
) -> Result<User, sqlx::Error> {
    let fresh = User::new(email.to_string());
    sqlx::query(
        "INSERT INTO users (id, email, otp, otp_created_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT(email) DO UPDATE SET otp = excluded.otp, otp_created_at = excluded.otp_created_at",
    )
    .bind(&fresh.id)
    .bind(email)
    .bind(otp)
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_email(pool, email)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Clear any pending OTP
pub async fn clear_otp(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET otp = NULL, otp_created_at = NULL WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace the user's MPIN
pub async fn set_mpin(
    pool: &SqlitePool,
    id: &str,
    mpin: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET mpin = ?, updated_at = ? WHERE id = ?")
        .bind(mpin)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Apply a partial profile update and return the updated user
pub async fn update_profile(
    pool: &SqlitePool,
    id: &str,
    update: &ProfileUpdate,
    now: DateTime<Utc>,
) -> Result<Option<User>, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET \
            name = COALESCE(?, name), \
            department = COALESCE(?, department), \
            designation = COALESCE(?, designation), \
            updated_at = ? \
         WHERE id = ?",
    )
    .bind(&update.name)
    .bind(&update.department)
    .bind(&update.designation)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, id).await
}
