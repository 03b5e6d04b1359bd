//! Subcommands and their execution against an [`RbacService`].

use clap::Subcommand;
use rolegate_authz::RbacService;
use rolegate_core::cache::CacheStore;
use rolegate_core::error::RbacResult;
use rolegate_core::repository::{PermissionRepository, RoleRepository};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a permission
    PermissionsCreate {
        /// The code of the permission
        code: String,
        /// The name of the guard
        guard: Option<String>,
    },

    /// Create a role, optionally granting it permissions
    RoleCreate {
        /// The code of the role
        code: String,
        /// The name of the guard
        guard: Option<String>,
        /// Permissions to grant, separated by `|`; missing ones are created
        permissions: Option<String>,
    },

    /// Flush the permission cache
    CacheReset,
}

/// Message to show the user.
#[derive(Debug, PartialEq, Eq)]
pub enum Report {
    Info(String),
    Warning(String),
}

/// Split a `|`-separated permission list, dropping blank entries.
fn split_permissions(list: &str) -> Vec<&str> {
    list.split('|')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .collect()
}

pub async fn execute<P, R, C>(service: &RbacService<P, R, C>, command: Command) -> RbacResult<Report>
where
    P: PermissionRepository,
    R: RoleRepository,
    C: CacheStore,
{
    match command {
        Command::PermissionsCreate { code, guard } => {
            let permission = service
                .find_or_create_permission(&code, guard.as_deref())
                .await?;
            let outcome = if permission.was_created {
                "created"
            } else {
                "already exists"
            };
            Ok(Report::Info(format!(
                "Permission `{}` {outcome}",
                permission.record.code
            )))
        }

        Command::RoleCreate {
            code,
            guard,
            permissions,
        } => {
            let role = service.find_or_create_role(&code, guard.as_deref()).await?;

            for code in permissions.as_deref().map(split_permissions).unwrap_or_default() {
                let permission = service
                    .find_or_create_permission(code, Some(&role.record.guard_name))
                    .await?;
                service
                    .give_permission_to_role(&role.record, permission.record)
                    .await?;
            }

            let outcome = if role.was_created { "created" } else { "updated" };
            Ok(Report::Info(format!("Role `{}` {outcome}", role.record.code)))
        }

        Command::CacheReset => {
            if service.forget_cached_permissions().await? {
                Ok(Report::Info("Permission cache flushed.".into()))
            } else {
                Ok(Report::Warning("Unable to flush cache.".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rolegate_authz::{AuthzConfig, MemoryCacheStore};
    use rolegate_db::repository::{SurrealPermissionRepository, SurrealRoleRepository};
    use rolegate_db::{DbConfig, DbManager};
    use surrealdb::engine::any::Any;

    use super::*;

    type Service =
        RbacService<SurrealPermissionRepository<Any>, SurrealRoleRepository<Any>, MemoryCacheStore>;

    async fn service() -> Service {
        let db = DbManager::open(&DbConfig::in_memory()).await.unwrap();
        RbacService::new(
            db.permissions(),
            db.roles(),
            MemoryCacheStore::new(),
            AuthzConfig::default(),
        )
    }

    #[test]
    fn permission_lists_are_split_and_trimmed() {
        assert_eq!(split_permissions("edit | publish|view"), ["edit", "publish", "view"]);
        assert_eq!(split_permissions("edit||"), ["edit"]);
        assert!(split_permissions("  ").is_empty());
    }

    #[tokio::test]
    async fn permissions_create_reports_existing() {
        let service = service().await;
        let command = || Command::PermissionsCreate {
            code: "edit".into(),
            guard: None,
        };

        assert_eq!(
            execute(&service, command()).await.unwrap(),
            Report::Info("Permission `edit` created".into())
        );
        assert_eq!(
            execute(&service, command()).await.unwrap(),
            Report::Info("Permission `edit` already exists".into())
        );
    }

    #[tokio::test]
    async fn role_create_grants_listed_permissions() {
        let service = service().await;

        let report = execute(
            &service,
            Command::RoleCreate {
                code: "writer".into(),
                guard: Some("web".into()),
                permissions: Some("edit|publish".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(report, Report::Info("Role `writer` created".into()));

        let writer = service.find_role("writer", Some("web")).await.unwrap();
        assert!(service.role_has_permission_to(&writer, "edit").await.unwrap());
        assert!(service.role_has_permission_to(&writer, "publish").await.unwrap());

        let report = execute(
            &service,
            Command::RoleCreate {
                code: "writer".into(),
                guard: None,
                permissions: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(report, Report::Info("Role `writer` updated".into()));
    }

    #[tokio::test]
    async fn cache_reset_reports_whether_anything_was_flushed() {
        let service = service().await;

        assert_eq!(
            execute(&service, Command::CacheReset).await.unwrap(),
            Report::Warning("Unable to flush cache.".into())
        );

        service.registrar().permissions().await.unwrap();
        assert_eq!(
            execute(&service, Command::CacheReset).await.unwrap(),
            Report::Info("Permission cache flushed.".into())
        );
    }
}
