//! Rolegate Core: domain models, error types, and the storage and cache
//! traits shared by every rolegate crate.

pub mod cache;
pub mod error;
pub mod models;
pub mod repository;
