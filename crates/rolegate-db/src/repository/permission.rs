//! SurrealDB implementation of [`PermissionRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rolegate_core::error::{RbacError, RbacResult};
use rolegate_core::models::permission::{CreatePermission, Permission};
use rolegate_core::models::record::Record;
use rolegate_core::models::role::Role;
use rolegate_core::models::subject::SubjectRef;
use rolegate_core::repository::PermissionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::parse_uuid;
use super::role::RoleRowWithId;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    code: String,
    guard_name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PermissionRowWithId {
    record_id: String,
    code: String,
    guard_name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// One `role -> grants -> permission` edge.
#[derive(Debug, SurrealValue)]
struct GrantRow {
    role_id: String,
    permission_id: String,
}

impl PermissionRow {
    fn into_permission(self, id: Uuid) -> Permission {
        Permission {
            id,
            code: self.code,
            guard_name: self.guard_name,
            description: self.description,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
            roles: Vec::new(),
        }
    }
}

impl PermissionRowWithId {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        let id = parse_uuid(&self.record_id)?;
        Ok(Permission {
            id,
            code: self.code,
            guard_name: self.guard_name,
            description: self.description,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
            roles: Vec::new(),
        })
    }
}

fn collect_permissions(rows: Vec<PermissionRowWithId>) -> Result<Vec<Permission>, DbError> {
    rows.into_iter()
        .map(PermissionRowWithId::try_into_permission)
        .collect()
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> RbacResult<Permission> {
        let guard_name = input.guard_name.ok_or_else(|| RbacError::Validation {
            message: "permission guard_name must be resolved before insert".into(),
        })?;
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 code = $code, guard_name = $guard_name, \
                 description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("code", input.code.clone()))
            .bind(("guard_name", guard_name.clone()))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| {
            let err = DbError::Query(e.to_string());
            if err.is_unique_violation() {
                RbacError::already_exists(Permission::ENTITY, &input.code, &guard_name)
            } else {
                err.into()
            }
        })?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: Permission::ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_permission(id))
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<Permission> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('permission', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: Permission::ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_permission(id))
    }

    async fn find_by_code(&self, code: &str, guard_name: &str) -> RbacResult<Option<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE code = $code AND guard_name = $guard_name \
                 LIMIT 1",
            )
            .bind(("code", code.to_owned()))
            .bind(("guard_name", guard_name.to_owned()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_permission()?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        let id_str = id.to_string();

        // Delete pivots first, then the permission record.
        let query = format!(
            "DELETE grants WHERE out = permission:`{id_str}`; \
             DELETE subject_permission WHERE permission = permission:`{id_str}`; \
             DELETE type::record('permission', $id);"
        );

        self.db
            .query(query)
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_with_roles(&self) -> RbacResult<Vec<Permission>> {
        // Three statements in one round trip: permissions, grant edges,
        // and every role referenced by at least one grant.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 ORDER BY created_at ASC; \
                 SELECT meta::id(in) AS role_id, meta::id(out) AS permission_id \
                 FROM grants; \
                 SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE id IN (SELECT VALUE in FROM grants);",
            )
            .await
            .map_err(DbError::from)?;

        let permission_rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let grant_rows: Vec<GrantRow> = result.take(1).map_err(DbError::from)?;
        let role_rows: Vec<RoleRowWithId> = result.take(2).map_err(DbError::from)?;

        debug!(
            permissions = permission_rows.len(),
            grants = grant_rows.len(),
            roles = role_rows.len(),
            "Loaded permission graph"
        );

        let roles = role_rows
            .into_iter()
            .map(|row| row.try_into_role().map(|role| (role.id.to_string(), role)))
            .collect::<Result<HashMap<String, Role>, DbError>>()?;

        let mut granted: HashMap<String, Vec<Role>> = HashMap::new();
        for grant in grant_rows {
            if let Some(role) = roles.get(&grant.role_id) {
                granted
                    .entry(grant.permission_id)
                    .or_default()
                    .push(role.clone());
            }
        }

        let mut permissions = collect_permissions(permission_rows)?;
        for permission in &mut permissions {
            if let Some(mut linked) = granted.remove(&permission.id.to_string()) {
                // Edge order is unspecified; keep snapshots deterministic.
                linked.sort_by(|a, b| a.code.cmp(&b.code).then(a.id.cmp(&b.id)));
                permission.roles = linked;
            }
        }

        Ok(permissions)
    }

    async fn grant_to_role(&self, role_id: Uuid, permission_id: Uuid) -> RbacResult<()> {
        let role_id_str = role_id.to_string();
        let perm_id_str = permission_id.to_string();

        let query = format!(
            "DELETE grants WHERE \
             in = role:`{role_id_str}` AND out = permission:`{perm_id_str}`; \
             RELATE role:`{role_id_str}` -> grants -> permission:`{perm_id_str}`;"
        );

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn revoke_from_role(&self, role_id: Uuid, permission_id: Uuid) -> RbacResult<()> {
        self.db
            .query(
                "DELETE grants WHERE \
                 in = type::record('role', $role_id) AND \
                 out = type::record('permission', $perm_id)",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("perm_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_role_permissions(&self, role_id: Uuid) -> RbacResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in = type::record('role', $role_id)\
                 ) \
                 ORDER BY code ASC",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(collect_permissions(rows)?)
    }

    async fn assign_to_subject(&self, permission_id: Uuid, subject: &SubjectRef) -> RbacResult<()> {
        self.db
            .query(
                "DELETE subject_permission WHERE \
                 permission = type::record('permission', $permission_id) AND \
                 subject_type = $subject_type AND subject_id = $subject_id; \
                 CREATE subject_permission SET \
                 permission = type::record('permission', $permission_id), \
                 subject_type = $subject_type, subject_id = $subject_id;",
            )
            .bind(("permission_id", permission_id.to_string()))
            .bind(("subject_type", subject.subject_type.clone()))
            .bind(("subject_id", subject.subject_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn unassign_from_subject(
        &self,
        permission_id: Uuid,
        subject: &SubjectRef,
    ) -> RbacResult<()> {
        self.db
            .query(
                "DELETE subject_permission WHERE \
                 permission = type::record('permission', $permission_id) AND \
                 subject_type = $subject_type AND subject_id = $subject_id",
            )
            .bind(("permission_id", permission_id.to_string()))
            .bind(("subject_type", subject.subject_type.clone()))
            .bind(("subject_id", subject.subject_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_subject_permissions(&self, subject: &SubjectRef) -> RbacResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (\
                     SELECT VALUE permission FROM subject_permission \
                     WHERE subject_type = $subject_type \
                     AND subject_id = $subject_id\
                 ) \
                 ORDER BY code ASC",
            )
            .bind(("subject_type", subject.subject_type.clone()))
            .bind(("subject_id", subject.subject_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(collect_permissions(rows)?)
    }
}
