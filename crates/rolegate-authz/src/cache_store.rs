//! In-process cache backends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rolegate_core::cache::CacheStore;
use rolegate_core::error::RbacResult;
use serde_json::Value;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    /// `None` when the TTL is too large to represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local cache backed by a shared map. Clones share entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> RbacResult<Option<Value>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }
        // Expired: drop it, unless another writer replaced it meanwhile.
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> RbacResult<()> {
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.write().insert(key.to_owned(), entry);
        Ok(())
    }

    async fn forget(&self, key: &str) -> RbacResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }
}

/// Backend that never retains anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCacheStore;

impl CacheStore for NullCacheStore {
    async fn get(&self, _key: &str) -> RbacResult<Option<Value>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: Value, _ttl: Duration) -> RbacResult<()> {
        Ok(())
    }

    async fn forget(&self, _key: &str) -> RbacResult<bool> {
        Ok(false)
    }
}
