/**
 * Ephemeral Key-Value Store
 *
 * Short-lived state (USSD sessions, password-reset codes) kept in the
 * `ephemeral_entries` table so it survives restarts and is shared between
 * server processes using the same database. Entries carry an absolute expiry;
 * expired entries are invisible to readers and removed by `purge_expired`,
 * which the server runs periodically.
 */

use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::backend::error::BackendError;

/// Namespaces used by the backend
pub mod namespace {
    pub const USSD_SESSION: &str = "ussd_session";
    pub const PASSWORD_RESET: &str = "password_reset";
}

/// TTL-bounded store backed by SQLite
#[derive(Clone)]
pub struct EphemeralStore {
    pool: SqlitePool,
}

impl EphemeralStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a value, resetting its expiry
    pub async fn put<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), BackendError> {
        let payload = serde_json::to_string(value)?;
        let expires_at = Utc::now().timestamp_millis() + ttl.as_millis() as i64;

        sqlx::query(
            r#"
            INSERT INTO ephemeral_entries (namespace, key, value, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(namespace)
        .bind(key)
        .bind(payload)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Read a live value
    pub async fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Result<Option<T>, BackendError> {
        let row = sqlx::query("SELECT value FROM ephemeral_entries WHERE namespace = ? AND key = ? AND expires_at > ?")
            .bind(namespace)
            .bind(key)
            .bind(Utc::now().timestamp_millis())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let payload: String = row.try_get("value")?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    /// Replace a live value only if it still equals `current`, keeping its expiry
    pub async fn compare_and_swap<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        current: &T,
        next: &T,
    ) -> Result<bool, BackendError> {
        let result = sqlx::query(
            r#"
            UPDATE ephemeral_entries SET value = ?
            WHERE namespace = ? AND key = ? AND value = ? AND expires_at > ?
            "#,
        )
        .bind(serde_json::to_string(next)?)
        .bind(namespace)
        .bind(key)
        .bind(serde_json::to_string(current)?)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete a live value only if it still equals `current`
    pub async fn compare_and_remove<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        current: &T,
    ) -> Result<bool, BackendError> {
        let result = sqlx::query(
            "DELETE FROM ephemeral_entries WHERE namespace = ? AND key = ? AND value = ? AND expires_at > ?",
        )
        .bind(namespace)
        .bind(key)
        .bind(serde_json::to_string(current)?)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete an entry whether or not it has expired
    pub async fn remove(&self, namespace: &str, key: &str) -> Result<(), BackendError> {
        sqlx::query("DELETE FROM ephemeral_entries WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> Result<u64, BackendError> {
        let result = sqlx::query("DELETE FROM ephemeral_entries WHERE expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
