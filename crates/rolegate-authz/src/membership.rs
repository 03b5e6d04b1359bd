//! Role ↔ permission membership checks.

use rolegate_core::cache::CacheStore;
use rolegate_core::error::RbacResult;
use rolegate_core::models::permission::Permission;
use rolegate_core::models::role::Role;
use rolegate_core::repository::{PermissionRepository, RoleRepository};

use crate::service::{RbacService, ensure_guard};

/// A permission given either by its code or as an already loaded record.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionRef {
    ByCode(String),
    Resolved(Permission),
}

impl From<&str> for PermissionRef {
    fn from(code: &str) -> Self {
        Self::ByCode(code.to_owned())
    }
}

impl From<String> for PermissionRef {
    fn from(code: String) -> Self {
        Self::ByCode(code)
    }
}

impl From<Permission> for PermissionRef {
    fn from(permission: Permission) -> Self {
        Self::Resolved(permission)
    }
}

impl From<&Permission> for PermissionRef {
    fn from(permission: &Permission) -> Self {
        Self::Resolved(permission.clone())
    }
}

impl<P: PermissionRepository, R: RoleRepository, C: CacheStore> RbacService<P, R, C> {
    /// Turn a reference into a permission record. Codes are looked up in
    /// `guard_name`; resolved records are returned as they are.
    pub async fn resolve_permission(
        &self,
        permission: PermissionRef,
        guard_name: &str,
    ) -> RbacResult<Permission> {
        match permission {
            PermissionRef::ByCode(code) => self.find_permission(&code, Some(guard_name)).await,
            PermissionRef::Resolved(permission) => Ok(permission),
        }
    }

    /// Whether `role` carries `permission`.
    ///
    /// A code is resolved within the role's guard and fails with
    /// `DoesNotExist` if it is unknown there. A permission from another
    /// guard fails with `GuardMismatch`. With wildcard permissions
    /// enabled, the role's permission codes are matched as patterns and a
    /// requested code need not exist as a record.
    pub async fn role_has_permission_to(
        &self,
        role: &Role,
        permission: impl Into<PermissionRef>,
    ) -> RbacResult<bool> {
        let permission = permission.into();
        let guard_names = role.guard_names();

        let requested = match permission {
            PermissionRef::ByCode(code) if self.config.enable_wildcard_permission => code,
            other => {
                let permission = self.resolve_permission(other, &role.guard_name).await?;
                ensure_guard(&permission, guard_names.clone())?;

                if !self.config.enable_wildcard_permission {
                    let snapshot = self.registrar.permissions().await?;
                    return Ok(snapshot.role_has_permission(role.id, permission.id));
                }
                permission.code
            }
        };

        let snapshot = self.registrar.permissions().await?;
        let granted = snapshot
            .role_permissions(role.id)
            .filter(|p| guard_names.contains(&p.guard_name))
            .any(|p| self.matcher.implies(&p.code, &requested));

        Ok(granted)
    }
}
