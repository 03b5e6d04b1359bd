//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use rolegate_core::error::{RbacError, RbacResult};
use rolegate_core::models::record::Record;
use rolegate_core::models::role::{CreateRole, Role};
use rolegate_core::models::subject::SubjectRef;
use rolegate_core::repository::RoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{normalize_key, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    code: String,
    guard_name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
pub(crate) struct RoleRowWithId {
    record_id: String,
    code: String,
    guard_name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self, id: Uuid) -> Role {
        Role {
            id,
            code: self.code,
            guard_name: self.guard_name,
            description: self.description,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }
}

impl RoleRowWithId {
    pub(crate) fn try_into_role(self) -> Result<Role, DbError> {
        let id = parse_uuid(&self.record_id)?;
        Ok(Role {
            id,
            code: self.code,
            guard_name: self.guard_name,
            description: self.description,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        })
    }
}

fn first_role(rows: Vec<RoleRowWithId>) -> Result<Option<Role>, DbError> {
    rows.into_iter()
        .next()
        .map(RoleRowWithId::try_into_role)
        .transpose()
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> RbacResult<Role> {
        let guard_name = input.guard_name.ok_or_else(|| RbacError::Validation {
            message: "role guard_name must be resolved before insert".into(),
        })?;
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
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
                RbacError::already_exists(Role::ENTITY, &input.code, &guard_name)
            } else {
                err.into()
            }
        })?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: Role::ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_role(id))
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: Role::ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_role(id))
    }

    async fn find_by_code(&self, code: &str, guard_name: &str) -> RbacResult<Option<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE code = $code AND guard_name = $guard_name \
                 LIMIT 1",
            )
            .bind(("code", code.to_owned()))
            .bind(("guard_name", guard_name.to_owned()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(first_role(rows)?)
    }

    async fn find_by_code_or_id(&self, code_or_id: &str, guard_name: &str) -> RbacResult<Option<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE guard_name = $guard_name \
                 AND (code = $key OR meta::id(id) = $key) \
                 LIMIT 1",
            )
            .bind(("key", normalize_key(code_or_id)))
            .bind(("guard_name", guard_name.to_owned()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(first_role(rows)?)
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        let id_str = id.to_string();

        let query = format!(
            "DELETE grants WHERE in = role:`{id_str}`; \
             DELETE subject_role WHERE role = role:`{id_str}`; \
             DELETE type::record('role', $id);"
        );

        self.db
            .query(query)
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn assign_to_subject(&self, role_id: Uuid, subject: &SubjectRef) -> RbacResult<()> {
        self.db
            .query(
                "DELETE subject_role WHERE \
                 role = type::record('role', $role_id) AND \
                 subject_type = $subject_type AND subject_id = $subject_id; \
                 CREATE subject_role SET \
                 role = type::record('role', $role_id), \
                 subject_type = $subject_type, subject_id = $subject_id;",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("subject_type", subject.subject_type.clone()))
            .bind(("subject_id", subject.subject_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn unassign_from_subject(&self, role_id: Uuid, subject: &SubjectRef) -> RbacResult<()> {
        self.db
            .query(
                "DELETE subject_role WHERE \
                 role = type::record('role', $role_id) AND \
                 subject_type = $subject_type AND subject_id = $subject_id",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("subject_type", subject.subject_type.clone()))
            .bind(("subject_id", subject.subject_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_subject_roles(&self, subject: &SubjectRef) -> RbacResult<Vec<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE id IN (\
                     SELECT VALUE role FROM subject_role \
                     WHERE subject_type = $subject_type \
                     AND subject_id = $subject_id\
                 ) \
                 ORDER BY code ASC",
            )
            .bind(("subject_type", subject.subject_type.clone()))
            .bind(("subject_id", subject.subject_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_role().map_err(RbacError::from))
            .collect()
    }
}
