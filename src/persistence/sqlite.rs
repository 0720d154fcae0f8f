//! SQLite-backed implementation of the state store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteRow},
    Row, SqlitePool,
};

use super::{error::PersistenceError, traits::StateStore};
use crate::models::{StatePayload, StateRecord};

/// SQL statements for watch state operations.
mod sql {
    pub const SELECT_RECORD: &str = "SELECT entity_key, fingerprint, payload, last_checked_at, \
                                     last_changed_at FROM watch_state WHERE entity_key = ?";

    pub const UPSERT_RECORD: &str = "INSERT INTO watch_state (entity_key, fingerprint, payload, \
                                     last_checked_at, last_changed_at) VALUES (?, ?, ?, ?, ?) ON \
                                     CONFLICT(entity_key) DO UPDATE SET fingerprint = \
                                     excluded.fingerprint, payload = excluded.payload, \
                                     last_checked_at = excluded.last_checked_at, last_changed_at \
                                     = excluded.last_changed_at";

    pub const DELETE_ALL: &str = "DELETE FROM watch_state";

    pub const SELECT_KEYS: &str = "SELECT entity_key FROM watch_state ORDER BY entity_key";
}

/// A concrete implementation of the state store using SQLite.
pub struct SqliteStateStore {
    /// The SQLite connection pool used for database operations.
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Connects to the SQLite database at the given URL, creating the file
    /// if it does not exist.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        tracing::debug!(database_url, "Connecting to SQLite database.");
        let options =
            SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        tracing::info!(database_url, "Connected to SQLite database.");
        Ok(Self { pool })
    }

    /// Runs embedded database migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations.");
            e
        })?;
        tracing::info!("Database migrations completed.");
        Ok(())
    }

    /// Closes the connection pool gracefully.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite connection pool closed.");
    }

    fn record_from_row(row: &SqliteRow) -> Result<StateRecord, PersistenceError> {
        let payload_json: String = row.try_get("payload")?;
        let payload: StatePayload = serde_json::from_str(&payload_json)?;
        Ok(StateRecord {
            entity_key: row.try_get("entity_key")?,
            fingerprint: row.try_get("fingerprint")?,
            payload,
            last_checked_at: row
                .try_get::<DateTime<Utc>, _>("last_checked_at")
                ?,
            last_changed_at: row
                .try_get::<Option<DateTime<Utc>>, _>("last_changed_at")
                ?,
        })
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get(&self, entity_key: &str) -> Result<Option<StateRecord>, PersistenceError> {
        let row = sqlx::query(sql::SELECT_RECORD)
            .bind(entity_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, entity_key, "Failed to read state record.");
                e
            })?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    #[tracing::instrument(skip(self, record), fields(entity_key = %record.entity_key), level = "debug")]
    async fn put(&self, record: &StateRecord) -> Result<(), PersistenceError> {
        let payload_json = serde_json::to_string(&record.payload)?;

        sqlx::query(sql::UPSERT_RECORD)
            .bind(&record.entity_key)
            .bind(&record.fingerprint)
            .bind(payload_json)
            .bind(record.last_checked_at)
            .bind(record.last_changed_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, entity_key = %record.entity_key, "Failed to upsert state record.");
                e
            })?;

        Ok(())
    }

    #[tracing::instrument(skip(self), level = "info")]
    async fn reset(&self) -> Result<(), PersistenceError> {
        let result = sqlx::query(sql::DELETE_ALL).execute(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to reset state store.");
            e
        })?;
        tracing::info!(cleared = result.rows_affected(), "State store reset.");
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn list_keys(&self) -> Result<Vec<String>, PersistenceError> {
        let rows = sqlx::query(sql::SELECT_KEYS).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("entity_key").map_err(PersistenceError::from)
            })
            .collect()
    }
}
