//! Rolegate authorization: the permission cache engine and the
//! guard-scoped lookup layer built on it.
//!
//! Permissions and their role links are compacted into a small aliased
//! snapshot, stored in a [`CacheStore`](rolegate_core::cache::CacheStore),
//! and hydrated back into records held by a [`PermissionRegistrar`].
//! [`RbacService`] answers lookups and membership checks from that
//! snapshot and invalidates it on every write.
//!
//! Like the storage traits it consumes, this crate has no dependency on
//! `rolegate-db`; any repository implementation can be plugged in.

pub mod cache_store;
pub mod compaction;
pub mod config;
pub mod error;
pub mod filter;
pub mod membership;
pub mod registrar;
pub mod service;
pub mod wildcard;

pub use cache_store::{MemoryCacheStore, NullCacheStore};
pub use config::{AuthzConfig, CacheBackend, CacheConfig};
pub use error::AuthzError;
pub use filter::AttributeFilter;
pub use membership::PermissionRef;
pub use registrar::{PermissionRegistrar, RegistrarStatus};
pub use service::{Created, RbacService};
pub use wildcard::{PermissionMatcher, WildcardMatcher};
