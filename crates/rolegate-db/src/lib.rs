//! Rolegate Database: SurrealDB connection management, schema
//! migrations, repository implementations, and a SurrealDB-backed cache
//! store.
//!
//! This crate provides:
//! - Opening a migrated store over any SurrealDB engine ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repositories for the `rolegate-core` traits ([`repository`])
//! - A shared cache backend ([`SurrealCacheStore`])
//! - Error types ([`DbError`])

mod cache;
mod connection;
mod error;
pub mod repository;
mod schema;

pub use cache::SurrealCacheStore;
pub use connection::{Credentials, DbConfig, DbManager};
pub use error::DbError;
pub use schema::run_migrations;
