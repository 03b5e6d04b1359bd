//! SurrealDB-backed [`CacheStore`], shared by every process pointed at
//! the same database.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rolegate_core::cache::CacheStore;
use rolegate_core::error::{RbacError, RbacResult};
use serde_json::Value;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CacheEntryRow {
    payload: Value,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CacheKeyRow {
    #[allow(dead_code)]
    record_id: String,
}

/// Cache entries live in the `cache_entry` table keyed by record id.
/// Expired entries are deleted lazily on read.
#[derive(Clone)]
pub struct SurrealCacheStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCacheStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl<C: Connection> CacheStore for SurrealCacheStore<C> {
    async fn get(&self, key: &str) -> RbacResult<Option<Value>> {
        let mut result = self
            .db
            .query("SELECT payload, expires_at FROM type::record('cache_entry', $key)")
            .bind(("key", key.to_owned()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CacheEntryRow> = result.take(0).map_err(DbError::from)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        if row.expires_at <= Utc::now() {
            debug!(key, "Cache entry expired");
            self.forget(key).await?;
            return Ok(None);
        }

        Ok(Some(row.payload))
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> RbacResult<()> {
        if !value.is_object() {
            return Err(RbacError::Cache(format!(
                "cache entry `{key}` must be a JSON object"
            )));
        }

        self.db
            .query(
                "UPSERT type::record('cache_entry', $key) SET \
                 payload = $payload, expires_at = $expires_at",
            )
            .bind(("key", key.to_owned()))
            .bind(("payload", value))
            .bind(("expires_at", expiry_from(Utc::now(), ttl)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn forget(&self, key: &str) -> RbacResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM type::record('cache_entry', $key); \
                 DELETE type::record('cache_entry', $key);",
            )
            .bind(("key", key.to_owned()))
            .await
            .map_err(DbError::from)?;

        let existing: Vec<CacheKeyRow> = result.take(0).map_err(DbError::from)?;

        Ok(!existing.is_empty())
    }
}
