//! Ownership of the hydrated permission snapshot.
//!
//! The registrar holds the last hydrated snapshot and serves it until a
//! write invalidates it. On a miss it reads the compacted snapshot from
//! the cache backend (building it from the store if the backend has
//! none), hydrates it and keeps the result.

use std::sync::Arc;

use parking_lot::RwLock;
use rolegate_core::cache::CacheStore;
use rolegate_core::error::RbacResult;
use rolegate_core::repository::PermissionRepository;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::compaction::{CompactSnapshot, HydratedSnapshot, compact};
use crate::config::CacheConfig;
use crate::error::AuthzError;

#[derive(Debug)]
enum CacheState {
    Empty,
    Ready(Arc<HydratedSnapshot>),
    Invalidated,
}

/// Held state plus the invalidation count it was last written under.
/// Both change together, under one lock.
#[derive(Debug)]
struct Held {
    state: CacheState,
    generation: u64,
}

/// Observable lifecycle of the held snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrarStatus {
    /// Nothing has been loaded yet.
    Empty,
    /// A load is in progress.
    Building,
    Ready,
    /// The snapshot was discarded and will be rebuilt on next access.
    Invalidated,
}

pub struct PermissionRegistrar<P: PermissionRepository, C: CacheStore> {
    repository: P,
    cache: C,
    config: CacheConfig,
    held: RwLock<Held>,
    /// Serializes loads so concurrent misses rebuild once.
    build_lock: Mutex<()>,
}

impl<P: PermissionRepository, C: CacheStore> PermissionRegistrar<P, C> {
    pub fn new(repository: P, cache: C, config: CacheConfig) -> Self {
        Self {
            repository,
            cache,
            config,
            held: RwLock::new(Held {
                state: CacheState::Empty,
                generation: 0,
            }),
            build_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &P {
        &self.repository
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn cache_key(&self) -> &str {
        &self.config.key
    }

    pub fn status(&self) -> RegistrarStatus {
        match &self.held.read().state {
            CacheState::Ready(_) => RegistrarStatus::Ready,
            _ if self.build_lock.try_lock().is_err() => RegistrarStatus::Building,
            CacheState::Empty => RegistrarStatus::Empty,
            CacheState::Invalidated => RegistrarStatus::Invalidated,
        }
    }

    fn ready_snapshot(&self) -> Option<Arc<HydratedSnapshot>> {
        match &self.held.read().state {
            CacheState::Ready(snapshot) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }

    /// The current snapshot, loading it if none is held.
    pub async fn permissions(&self) -> RbacResult<Arc<HydratedSnapshot>> {
        if let Some(snapshot) = self.ready_snapshot() {
            return Ok(snapshot);
        }

        let _build = self.build_lock.lock().await;
        if let Some(snapshot) = self.ready_snapshot() {
            return Ok(snapshot);
        }

        let generation = self.held.read().generation;
        let snapshot = Arc::new(self.load().await?);

        let published = {
            let mut held = self.held.write();
            let current = held.generation == generation;
            if current {
                held.state = CacheState::Ready(Arc::clone(&snapshot));
            }
            current
        };

        if !published {
            // A write landed mid-load; the backend may now hold stale data.
            warn!(
                key = %self.config.key,
                "Permission cache invalidated during load; discarding snapshot"
            );
            self.cache.forget(&self.config.key).await?;
        }

        Ok(snapshot)
    }

    /// Read and hydrate the backend entry. An entry that cannot be decoded
    /// is forgotten and rebuilt once; if the rebuilt entry cannot be
    /// decoded either, the error is returned.
    async fn load(&self) -> RbacResult<HydratedSnapshot> {
        let hydrated = match decode(self.remember().await?) {
            Ok(hydrated) => hydrated,
            Err(err) => {
                warn!(
                    key = %self.config.key,
                    error = %err,
                    "Cached permission snapshot is unusable; rebuilding"
                );
                self.cache.forget(&self.config.key).await?;
                decode(self.remember().await?)?
            }
        };

        debug!(permissions = hydrated.len(), "Hydrated permission snapshot");
        Ok(hydrated)
    }

    async fn remember(&self) -> RbacResult<Value> {
        self.cache
            .remember(&self.config.key, self.config.ttl(), || self.build_value())
            .await
    }

    async fn build_value(&self) -> RbacResult<Value> {
        Ok(self.build().await?.to_value()?)
    }

    /// Build a fresh snapshot from the store, bypassing every cache.
    pub async fn build(&self) -> RbacResult<CompactSnapshot> {
        let permissions = self.repository.list_with_roles().await?;
        let snapshot = compact(&permissions, &self.config.column_names_except);

        info!(
            permissions = snapshot.permissions.len(),
            roles = snapshot.roles.len(),
            "Built permission cache snapshot"
        );

        Ok(snapshot)
    }

    /// Drop the held snapshot and the backend entry. Returns whether the
    /// backend had an entry.
    pub async fn forget_cached_permissions(&self) -> RbacResult<bool> {
        {
            let mut held = self.held.write();
            held.generation += 1;
            held.state = CacheState::Invalidated;
        }

        let forgotten = self.cache.forget(&self.config.key).await?;
        debug!(forgotten, key = %self.config.key, "Permission cache invalidated");
        Ok(forgotten)
    }

    /// Drop only the held snapshot; the next access reloads it from the
    /// backend.
    pub fn clear_held_permissions(&self) {
        self.held.write().state = CacheState::Invalidated;
    }
}

fn decode(value: Value) -> Result<HydratedSnapshot, AuthzError> {
    CompactSnapshot::from_value(value)?.hydrate()
}
