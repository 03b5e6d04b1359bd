//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as record
//! ids (`permission:<uuid>`) and, inside pivots, as record links.

use surrealdb::{Connection, Surreal};
use tracing::{debug, info};

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "rbac_tables",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: permissions, roles, pivots, cache entries
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Permissions (guard scope)
-- =======================================================================
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD code ON TABLE permission TYPE string;
DEFINE FIELD guard_name ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE option<string>;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_code_guard ON TABLE permission \
    COLUMNS code, guard_name UNIQUE;

-- =======================================================================
-- Roles (guard scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD code ON TABLE role TYPE string;
DEFINE FIELD guard_name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE option<string>;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_code_guard ON TABLE role \
    COLUMNS code, guard_name UNIQUE;

-- =======================================================================
-- Polymorphic subject pivots
-- =======================================================================
DEFINE TABLE subject_permission SCHEMAFULL;
DEFINE FIELD permission ON TABLE subject_permission TYPE record<permission>;
DEFINE FIELD subject_type ON TABLE subject_permission TYPE string;
DEFINE FIELD subject_id ON TABLE subject_permission TYPE string;
DEFINE INDEX idx_subject_permission_link ON TABLE subject_permission \
    COLUMNS permission, subject_type, subject_id UNIQUE;
DEFINE INDEX idx_subject_permission_subject ON TABLE subject_permission \
    COLUMNS subject_id, subject_type;

DEFINE TABLE subject_role SCHEMAFULL;
DEFINE FIELD role ON TABLE subject_role TYPE record<role>;
DEFINE FIELD subject_type ON TABLE subject_role TYPE string;
DEFINE FIELD subject_id ON TABLE subject_role TYPE string;
DEFINE INDEX idx_subject_role_link ON TABLE subject_role \
    COLUMNS role, subject_type, subject_id UNIQUE;
DEFINE INDEX idx_subject_role_subject ON TABLE subject_role \
    COLUMNS subject_id, subject_type;

-- =======================================================================
-- Cache entries (shared permission cache backend)
-- =======================================================================
DEFINE TABLE cache_entry SCHEMAFULL;
DEFINE FIELD payload ON TABLE cache_entry TYPE object FLEXIBLE;
DEFINE FIELD expires_at ON TABLE cache_entry TYPE datetime;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- Role -> Permission grants
DEFINE TABLE grants TYPE RELATION SCHEMAFULL;
";

/// Apply every migration not yet recorded in `_migration`, oldest first,
/// and return the versions applied by this call.
///
/// Each migration runs in one transaction together with its tracking
/// row, so a failed migration leaves no record behind and is retried on
/// the next run.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<Vec<u32>, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("cannot prepare `_migration`: {e}")))?;

    let recorded = recorded_versions(db).await?;
    let mut applied = Vec::new();

    for migration in MIGRATIONS.iter().filter(|m| !recorded.contains(&m.version)) {
        debug!(version = migration.version, name = migration.name, "Applying migration");
        apply(db, migration).await?;
        applied.push(migration.version);
    }

    if !applied.is_empty() {
        info!(versions = ?applied, "Schema migrated");
    }
    Ok(applied)
}

async fn recorded_versions<C: Connection>(db: &Surreal<C>) -> Result<Vec<u32>, DbError> {
    let mut result = db.query("SELECT VALUE version FROM _migration").await?;
    Ok(result.take(0)?)
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    let script = format!(
        "BEGIN TRANSACTION;\n{}\nCREATE _migration SET version = $version, name = $name;\nCOMMIT TRANSACTION;",
        migration.sql
    );

    db.query(script)
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map(drop)
        .map_err(|e| DbError::Migration(format!("v{} `{}`: {e}", migration.version, migration.name)))
}
