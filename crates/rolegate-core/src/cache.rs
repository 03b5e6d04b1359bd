//! Key-value cache backend abstraction.
//!
//! Values are structured JSON documents rather than opaque strings, so a
//! backend must be able to store nested objects and arrays.

use std::time::Duration;

use serde_json::Value;

use crate::error::RbacResult;

pub trait CacheStore: Send + Sync {
    /// Returns `None` if the key does not exist or has expired.
    fn get(&self, key: &str) -> impl Future<Output = RbacResult<Option<Value>>> + Send;

    fn put(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
    ) -> impl Future<Output = RbacResult<()>> + Send;

    /// Remove a key. Returns `Ok(true)` if an entry was removed.
    fn forget(&self, key: &str) -> impl Future<Output = RbacResult<bool>> + Send;

    /// Get-or-compute: return the cached value for `key`, or run `build`,
    /// store its output under `key` for `ttl` and return it.
    fn remember<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        build: F,
    ) -> impl Future<Output = RbacResult<Value>> + Send
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = RbacResult<Value>> + Send,
    {
        async move {
            if let Some(value) = self.get(key).await? {
                return Ok(value);
            }
            let value = build().await?;
            self.put(key, value.clone(), ttl).await?;
            Ok(value)
        }
    }
}
