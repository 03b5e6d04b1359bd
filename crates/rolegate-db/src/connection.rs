//! Opening the SurrealDB handle shared by the repositories and the
//! database cache backend.

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::cache::SurrealCacheStore;
use crate::error::DbError;
use crate::repository::{SurrealPermissionRepository, SurrealRoleRepository};
use crate::schema::run_migrations;

/// Root credentials for a SurrealDB server.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where the rolegate tables live.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Engine endpoint: `ws://host:port` for a server, `mem://` for an
    /// embedded in-memory store.
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    /// Signed in with before selecting the namespace. Embedded engines
    /// need none.
    pub credentials: Option<Credentials>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8000".into(),
            namespace: "rolegate".into(),
            database: "rbac".into(),
            credentials: Some(Credentials {
                username: "root".into(),
                password: "root".into(),
            }),
        }
    }
}

impl DbConfig {
    /// An embedded in-memory store, private to this process.
    pub fn in_memory() -> Self {
        Self {
            endpoint: "mem://".into(),
            credentials: None,
            ..Self::default()
        }
    }
}

/// An open, migrated rolegate store.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
}

impl DbManager {
    /// Connect to `config.endpoint`, select the namespace and database,
    /// and apply any pending migrations.
    pub async fn open(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            endpoint = %config.endpoint,
            namespace = %config.namespace,
            database = %config.database,
            "Opening rolegate store"
        );

        let db = any::connect(config.endpoint.as_str()).await?;

        if let Some(credentials) = &config.credentials {
            db.signin(Root {
                username: credentials.username.clone(),
                password: credentials.password.clone(),
            })
            .await?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        let applied = run_migrations(&db).await?;
        info!(applied = applied.len(), "Rolegate store ready");

        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }

    pub fn permissions(&self) -> SurrealPermissionRepository<Any> {
        SurrealPermissionRepository::new(self.db.clone())
    }

    pub fn roles(&self) -> SurrealRoleRepository<Any> {
        SurrealRoleRepository::new(self.db.clone())
    }

    /// Cache backend over the same store, visible to every process that
    /// opens it.
    pub fn cache_store(&self) -> SurrealCacheStore<Any> {
        SurrealCacheStore::new(self.db.clone())
    }
}
