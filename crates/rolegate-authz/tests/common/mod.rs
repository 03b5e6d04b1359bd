//! Shared fixtures for rolegate-authz integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use rolegate_authz::{AuthzConfig, MemoryCacheStore, RbacService};
use rolegate_core::cache::CacheStore;
use rolegate_core::error::RbacResult;
use rolegate_core::models::permission::{CreatePermission, Permission};
use rolegate_core::models::subject::SubjectRef;
use rolegate_core::repository::PermissionRepository;
use rolegate_db::repository::{SurrealPermissionRepository, SurrealRoleRepository};
use serde_json::{Value, json};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tokio::sync::Notify;
use uuid::Uuid;

pub type Service<C = CountingCache<MemoryCacheStore>> =
    RbacService<CountingPermissions<SurrealPermissionRepository<Db>>, SurrealRoleRepository<Db>, C>;

pub async fn database() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    rolegate_db::run_migrations(&db).await.unwrap();
    db
}

/// Service over a fresh in-memory database and memory cache.
pub async fn service() -> Service {
    service_with(AuthzConfig::default()).await
}

pub async fn service_with(config: AuthzConfig) -> Service {
    let db = database().await;
    service_on(&db, CountingCache::new(MemoryCacheStore::new()), config)
}

pub fn service_on<C: CacheStore>(db: &Surreal<Db>, cache: C, config: AuthzConfig) -> Service<C> {
    RbacService::new(
        CountingPermissions::new(SurrealPermissionRepository::new(db.clone())),
        SurrealRoleRepository::new(db.clone()),
        cache,
        config,
    )
}

#[derive(Debug, Default)]
pub struct Counters {
    pub creates: AtomicUsize,
    pub bulk_loads: AtomicUsize,
}

/// Holds the next bulk load after it has read the store, until released.
#[derive(Debug, Default)]
pub struct LoadGate {
    armed: AtomicBool,
    /// Notified once the held load has its rows.
    pub loaded: Notify,
    release: Notify,
}

impl LoadGate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.loaded.notify_one();
            self.release.notified().await;
        }
    }
}

/// Permission repository that counts creates and bulk loads.
pub struct CountingPermissions<P> {
    inner: P,
    pub counters: Arc<Counters>,
    pub gate: Arc<LoadGate>,
}

impl<P> CountingPermissions<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            counters: Arc::default(),
            gate: Arc::default(),
        }
    }

    pub fn creates(&self) -> usize {
        self.counters.creates.load(Ordering::SeqCst)
    }

    pub fn bulk_loads(&self) -> usize {
        self.counters.bulk_loads.load(Ordering::SeqCst)
    }
}

impl<P: PermissionRepository> PermissionRepository for CountingPermissions<P> {
    fn create(&self, input: CreatePermission) -> impl Future<Output = RbacResult<Permission>> + Send {
        self.counters.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(input)
    }

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RbacResult<Permission>> + Send {
        self.inner.get_by_id(id)
    }

    fn find_by_code(
        &self,
        code: &str,
        guard_name: &str,
    ) -> impl Future<Output = RbacResult<Option<Permission>>> + Send {
        self.inner.find_by_code(code, guard_name)
    }

    fn delete(&self, id: Uuid) -> impl Future<Output = RbacResult<()>> + Send {
        self.inner.delete(id)
    }

    fn list_with_roles(&self) -> impl Future<Output = RbacResult<Vec<Permission>>> + Send {
        self.counters.bulk_loads.fetch_add(1, Ordering::SeqCst);
        async move {
            let permissions = self.inner.list_with_roles().await;
            self.gate.pass().await;
            permissions
        }
    }

    fn grant_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = RbacResult<()>> + Send {
        self.inner.grant_to_role(role_id, permission_id)
    }

    fn revoke_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = RbacResult<()>> + Send {
        self.inner.revoke_from_role(role_id, permission_id)
    }

    fn get_role_permissions(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = RbacResult<Vec<Permission>>> + Send {
        self.inner.get_role_permissions(role_id)
    }

    fn assign_to_subject(
        &self,
        permission_id: Uuid,
        subject: &SubjectRef,
    ) -> impl Future<Output = RbacResult<()>> + Send {
        self.inner.assign_to_subject(permission_id, subject)
    }

    fn unassign_from_subject(
        &self,
        permission_id: Uuid,
        subject: &SubjectRef,
    ) -> impl Future<Output = RbacResult<()>> + Send {
        self.inner.unassign_from_subject(permission_id, subject)
    }

    fn get_subject_permissions(
        &self,
        subject: &SubjectRef,
    ) -> impl Future<Output = RbacResult<Vec<Permission>>> + Send {
        self.inner.get_subject_permissions(subject)
    }
}

/// Cache backend wrapper that counts every call.
pub struct CountingCache<C> {
    inner: C,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub forgets: AtomicUsize,
}

impl<C> CountingCache<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            forgets: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.puts.load(Ordering::SeqCst)
            + self.forgets.load(Ordering::SeqCst)
    }
}

impl<C: CacheStore> CacheStore for CountingCache<C> {
    fn get(&self, key: &str) -> impl Future<Output = RbacResult<Option<Value>>> + Send {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn put(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
    ) -> impl Future<Output = RbacResult<()>> + Send {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value, ttl)
    }

    fn forget(&self, key: &str) -> impl Future<Output = RbacResult<bool>> + Send {
        self.forgets.fetch_add(1, Ordering::SeqCst);
        self.inner.forget(key)
    }
}

/// Backend that answers every read with the same value and never stores
/// anything.
pub struct FixedCache {
    value: Value,
    pub forgets: AtomicUsize,
}

impl FixedCache {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            forgets: AtomicUsize::new(0),
        }
    }

    /// A pre-alias snapshot, as an entry written by an older release
    /// would look.
    pub fn legacy() -> Self {
        Self::new(json!({"permissions": [], "roles": []}))
    }
}

impl CacheStore for FixedCache {
    async fn get(&self, _key: &str) -> RbacResult<Option<Value>> {
        Ok(Some(self.value.clone()))
    }

    async fn put(&self, _key: &str, _value: Value, _ttl: Duration) -> RbacResult<()> {
        Ok(())
    }

    async fn forget(&self, _key: &str) -> RbacResult<bool> {
        self.forgets.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}
