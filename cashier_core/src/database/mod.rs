//! SQLite storage for customers, subscriptions and subscription items

pub mod migrations;
pub mod repositories;
pub mod schema;

use crate::{Error, Result, error::InternalError};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

pub use repositories::{CustomerRepository, SubscriptionRepository};

/// Database connection manager with connection pooling
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) a database and bring its schema up to date
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Internal(InternalError::io(e)))?;
        }

        let connect_options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                Error::Internal(InternalError::database(format!(
                    "Failed to connect to database at {}: {e}",
                    db_path.display()
                )))
            })?;

        let db = Self { pool };
        migrations::run_migrations(&db.pool).await?;

        log::debug!("Opened database at {}", db_path.display());
        Ok(db)
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn subscriptions(&self) -> SubscriptionRepository {
        SubscriptionRepository::new(self.pool.clone())
    }
}
