//! Database migration system
//!
//! Each migration runs in its own transaction and is recorded in
//! `schema_version`, so running migrations twice is a no-op.

use crate::{Error, Result, error::InternalError};
use sqlx::SqlitePool;

use super::schema::{SCHEMA_V1, SCHEMA_V2};
use crate::models::time_utils;

/// Run all necessary migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_current_version(pool).await?;

    if current_version < 1 {
        apply_migration(pool, 1, SCHEMA_V1).await?;
    }

    if current_version < 2 {
        apply_migration(pool, 2, SCHEMA_V2).await?;
    }

    Ok(())
}

/// Get the current schema version from the database
pub(crate) async fn get_current_version(pool: &SqlitePool) -> Result<i32> {
    if !table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version = sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

/// Apply a single migration
async fn apply_migration(pool: &SqlitePool, version: i32, sql: &str) -> Result<()> {
    log::debug!("Applying schema migration v{version}");

    let mut tx = pool.begin().await.map_err(|e| {
        Error::Internal(InternalError::database(format!(
            "Failed to start migration transaction: {e}"
        )))
    })?;

    sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
        Error::Internal(InternalError::database(format!(
            "Failed to apply migration {version}: {e}"
        )))
    })?;

    sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
        .bind(version)
        .bind(time_utils::now_millis())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            Error::Internal(InternalError::database(format!(
                "Failed to record migration {version}: {e}"
            )))
        })?;

    tx.commit().await.map_err(|e| {
        Error::Internal(InternalError::database(format!(
            "Failed to commit migration {version}: {e}"
        )))
    })?;

    Ok(())
}

/// Check if a table exists
pub(crate) async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
    )
    .bind(table_name)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}
