//! Authorization configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which [`CacheStore`](rolegate_core::cache::CacheStore) holds the
/// compacted permission snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map. Each process rebuilds its own snapshot.
    #[default]
    Memory,
    /// The `cache_entry` table, shared by every process on the database.
    Database,
    /// Retains nothing; every registrar miss rebuilds from the store.
    None,
}

/// Configuration for the permission cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Key under which the snapshot is stored (default:
    /// `rolegate.permission.cache`).
    pub key: String,
    /// Snapshot lifetime in seconds (default: 86_400 = 24 hours).
    pub expiration_secs: u64,
    /// Backend selector (default: memory).
    pub backend: CacheBackend,
    /// Attributes never written to the snapshot (default: `created_at`,
    /// `updated_at`, `deleted_at`).
    pub column_names_except: Vec<String>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key: "rolegate.permission.cache".into(),
            expiration_secs: 86_400,
            backend: CacheBackend::Memory,
            column_names_except: vec![
                "created_at".into(),
                "updated_at".into(),
                "deleted_at".into(),
            ],
        }
    }
}

/// Configuration for the authorization service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthzConfig {
    pub cache: CacheConfig,
    /// Guard used when a caller does not name one (default: `web`).
    pub default_guard: String,
    /// Subject type → guard, e.g. `service_account` → `api`. Subject
    /// types not listed use `default_guard`.
    pub subject_guards: HashMap<String, String>,
    /// Match permission codes as `.`-separated wildcard patterns
    /// (default: false).
    pub enable_wildcard_permission: bool,
}

impl AuthzConfig {
    /// Resolve an optional guard name to a concrete one.
    pub fn guard_or_default<'a>(&'a self, guard_name: Option<&'a str>) -> &'a str {
        guard_name.unwrap_or(&self.default_guard)
    }

    /// Guard that applies to a subject model type.
    pub fn guard_for_subject(&self, subject_type: &str) -> &str {
        self.subject_guards
            .get(subject_type)
            .map(String::as_str)
            .unwrap_or(&self.default_guard)
    }
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            default_guard: "web".into(),
            subject_guards: HashMap::new(),
            enable_wildcard_permission: false,
        }
    }
}
