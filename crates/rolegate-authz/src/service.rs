//! Guard-scoped lookups and writes over permissions, roles and their
//! assignments.

use std::sync::Arc;

use rolegate_core::cache::CacheStore;
use rolegate_core::error::{RbacError, RbacResult};
use rolegate_core::models::permission::{CreatePermission, Permission};
use rolegate_core::models::record::Record;
use rolegate_core::models::role::{CreateRole, Role};
use rolegate_core::models::subject::SubjectRef;
use rolegate_core::repository::{PermissionRepository, RoleRepository};
use tracing::info;
use uuid::Uuid;

use crate::config::AuthzConfig;
use crate::filter::AttributeFilter;
use crate::membership::PermissionRef;
use crate::registrar::PermissionRegistrar;
use crate::wildcard::{PermissionMatcher, WildcardMatcher};

/// Result of a find-or-create call.
#[derive(Debug, Clone, PartialEq)]
pub struct Created<T> {
    pub record: T,
    /// `false` when an existing record was returned.
    pub was_created: bool,
}

/// Authorization service.
///
/// Generic over repository and cache implementations so that the
/// authorization layer has no dependency on the database crate.
pub struct RbacService<P: PermissionRepository, R: RoleRepository, C: CacheStore> {
    pub(crate) registrar: Arc<PermissionRegistrar<P, C>>,
    pub(crate) role_repo: R,
    pub(crate) config: AuthzConfig,
    pub(crate) matcher: Arc<dyn PermissionMatcher>,
}

impl<P: PermissionRepository, R: RoleRepository, C: CacheStore> RbacService<P, R, C> {
    pub fn new(permission_repo: P, role_repo: R, cache: C, config: AuthzConfig) -> Self {
        let registrar = PermissionRegistrar::new(permission_repo, cache, config.cache.clone());
        Self::with_registrar(Arc::new(registrar), role_repo, config)
    }

    /// Build a service around an existing registrar, so several services
    /// can share one held snapshot.
    pub fn with_registrar(
        registrar: Arc<PermissionRegistrar<P, C>>,
        role_repo: R,
        config: AuthzConfig,
    ) -> Self {
        Self {
            registrar,
            role_repo,
            config,
            matcher: Arc::new(WildcardMatcher),
        }
    }

    /// Replace the matcher used when wildcard permissions are enabled.
    pub fn with_matcher(mut self, matcher: impl PermissionMatcher + 'static) -> Self {
        self.matcher = Arc::new(matcher);
        self
    }

    pub fn registrar(&self) -> &Arc<PermissionRegistrar<P, C>> {
        &self.registrar
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    /// Invalidate the permission cache now.
    pub async fn forget_cached_permissions(&self) -> RbacResult<bool> {
        self.registrar.forget_cached_permissions().await
    }

    // -------------------------------------------------------------------
    // Permissions
    // -------------------------------------------------------------------

    /// Cached permissions matching `filter`, in snapshot order. With
    /// `only_one`, at most the first match is returned.
    pub async fn get_permissions(
        &self,
        filter: &AttributeFilter,
        only_one: bool,
    ) -> RbacResult<Vec<Permission>> {
        let snapshot = self.registrar.permissions().await?;
        let matches = snapshot.permissions().iter().filter(|p| filter.matches(*p));

        Ok(if only_one {
            matches.take(1).cloned().collect()
        } else {
            matches.cloned().collect()
        })
    }

    /// Find a permission by code or id within a guard (the default guard
    /// when `None`).
    pub async fn find_permission(
        &self,
        code_or_id: &str,
        guard_name: Option<&str>,
    ) -> RbacResult<Permission> {
        let guard_name = self.config.guard_or_default(guard_name);
        let id = Uuid::parse_str(code_or_id).ok();
        let snapshot = self.registrar.permissions().await?;

        snapshot
            .permissions()
            .iter()
            .find(|p| p.guard_name == guard_name && (p.code == code_or_id || id == Some(p.id)))
            .cloned()
            .ok_or_else(|| RbacError::does_not_exist(Permission::ENTITY, code_or_id, guard_name))
    }

    async fn find_permission_by_code(
        &self,
        code: &str,
        guard_name: &str,
    ) -> RbacResult<Option<Permission>> {
        let filter = AttributeFilter::new().code(code).guard_name(guard_name);
        Ok(self.get_permissions(&filter, true).await?.into_iter().next())
    }

    pub async fn create_permission(&self, mut input: CreatePermission) -> RbacResult<Permission> {
        let guard_name = self
            .config
            .guard_or_default(input.guard_name.as_deref())
            .to_owned();

        if self
            .find_permission_by_code(&input.code, &guard_name)
            .await?
            .is_some()
        {
            return Err(RbacError::already_exists(
                Permission::ENTITY,
                input.code,
                guard_name,
            ));
        }

        input.guard_name = Some(guard_name);
        let permission = self.registrar.repository().create(input).await?;
        self.registrar.forget_cached_permissions().await?;

        info!(
            permission_id = %permission.id,
            code = %permission.code,
            guard = %permission.guard_name,
            "Permission created"
        );

        Ok(permission)
    }

    /// Return the permission with this code in the guard, creating it if
    /// it does not exist.
    pub async fn find_or_create_permission(
        &self,
        code: &str,
        guard_name: Option<&str>,
    ) -> RbacResult<Created<Permission>> {
        let guard_name = self.config.guard_or_default(guard_name).to_owned();

        if let Some(record) = self.find_permission_by_code(code, &guard_name).await? {
            return Ok(Created {
                record,
                was_created: false,
            });
        }

        let record = self
            .create_permission(CreatePermission::new(code, Some(&guard_name)))
            .await?;
        Ok(Created {
            record,
            was_created: true,
        })
    }

    pub async fn delete_permission(&self, id: Uuid) -> RbacResult<()> {
        self.registrar.repository().delete(id).await?;
        self.registrar.forget_cached_permissions().await?;
        info!(permission_id = %id, "Permission deleted");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Roles
    // -------------------------------------------------------------------

    /// Find a role by code or id within a guard (the default guard when
    /// `None`).
    pub async fn find_role(&self, code_or_id: &str, guard_name: Option<&str>) -> RbacResult<Role> {
        let guard_name = self.config.guard_or_default(guard_name);

        self.role_repo
            .find_by_code_or_id(code_or_id, guard_name)
            .await?
            .ok_or_else(|| RbacError::does_not_exist(Role::ENTITY, code_or_id, guard_name))
    }

    pub async fn create_role(&self, mut input: CreateRole) -> RbacResult<Role> {
        let guard_name = self
            .config
            .guard_or_default(input.guard_name.as_deref())
            .to_owned();

        if self
            .role_repo
            .find_by_code(&input.code, &guard_name)
            .await?
            .is_some()
        {
            return Err(RbacError::already_exists(Role::ENTITY, input.code, guard_name));
        }

        input.guard_name = Some(guard_name);
        let role = self.role_repo.create(input).await?;
        self.registrar.forget_cached_permissions().await?;

        info!(
            role_id = %role.id,
            code = %role.code,
            guard = %role.guard_name,
            "Role created"
        );

        Ok(role)
    }

    pub async fn find_or_create_role(
        &self,
        code: &str,
        guard_name: Option<&str>,
    ) -> RbacResult<Created<Role>> {
        let guard_name = self.config.guard_or_default(guard_name).to_owned();

        if let Some(record) = self.role_repo.find_by_code(code, &guard_name).await? {
            return Ok(Created {
                record,
                was_created: false,
            });
        }

        let record = self
            .create_role(CreateRole::new(code, Some(&guard_name)))
            .await?;
        Ok(Created {
            record,
            was_created: true,
        })
    }

    pub async fn delete_role(&self, id: Uuid) -> RbacResult<()> {
        self.role_repo.delete(id).await?;
        self.registrar.forget_cached_permissions().await?;
        info!(role_id = %id, "Role deleted");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Role ↔ permission grants
    // -------------------------------------------------------------------

    /// Resolve a permission for use with `role`, rejecting one from a
    /// guard the role does not belong to.
    async fn permission_for_role(
        &self,
        role: &Role,
        permission: PermissionRef,
    ) -> RbacResult<Permission> {
        let permission = self.resolve_permission(permission, &role.guard_name).await?;
        ensure_guard(&permission, role.guard_names())?;
        Ok(permission)
    }

    pub async fn give_permission_to_role(
        &self,
        role: &Role,
        permission: impl Into<PermissionRef>,
    ) -> RbacResult<()> {
        let permission = self.permission_for_role(role, permission.into()).await?;

        self.registrar
            .repository()
            .grant_to_role(role.id, permission.id)
            .await?;
        self.registrar.forget_cached_permissions().await?;

        info!(role = %role.code, permission = %permission.code, "Permission granted to role");
        Ok(())
    }

    pub async fn revoke_permission_from_role(
        &self,
        role: &Role,
        permission: impl Into<PermissionRef>,
    ) -> RbacResult<()> {
        let permission = self.permission_for_role(role, permission.into()).await?;

        self.registrar
            .repository()
            .revoke_from_role(role.id, permission.id)
            .await?;
        self.registrar.forget_cached_permissions().await?;

        info!(role = %role.code, permission = %permission.code, "Permission revoked from role");
        Ok(())
    }

    /// Make `permissions` the exact set granted to `role`. Every
    /// reference is resolved before anything is changed.
    pub async fn sync_role_permissions<I>(&self, role: &Role, permissions: I) -> RbacResult<()>
    where
        I: IntoIterator,
        I::Item: Into<PermissionRef>,
    {
        let mut wanted = Vec::new();
        for permission in permissions {
            let permission = self.permission_for_role(role, permission.into()).await?;
            if !wanted.iter().any(|p: &Permission| p.id == permission.id) {
                wanted.push(permission);
            }
        }

        let repository = self.registrar.repository();
        let current = repository.get_role_permissions(role.id).await?;

        for existing in &current {
            if !wanted.iter().any(|p| p.id == existing.id) {
                repository.revoke_from_role(role.id, existing.id).await?;
            }
        }
        for permission in &wanted {
            if !current.iter().any(|p| p.id == permission.id) {
                repository.grant_to_role(role.id, permission.id).await?;
            }
        }
        self.registrar.forget_cached_permissions().await?;

        info!(role = %role.code, permissions = wanted.len(), "Role permissions synced");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Subject assignments
    // -------------------------------------------------------------------

    /// Resolve a permission for direct use by `subject`, within the guard
    /// configured for the subject's type.
    async fn permission_for_subject(
        &self,
        subject: &SubjectRef,
        permission: PermissionRef,
    ) -> RbacResult<Permission> {
        let guard_name = self.config.guard_for_subject(&subject.subject_type);
        let permission = self.resolve_permission(permission, guard_name).await?;
        ensure_guard(&permission, vec![guard_name.to_owned()])?;
        Ok(permission)
    }

    pub async fn assign_permission_to_subject(
        &self,
        subject: &SubjectRef,
        permission: impl Into<PermissionRef>,
    ) -> RbacResult<()> {
        let permission = self.permission_for_subject(subject, permission.into()).await?;

        self.registrar
            .repository()
            .assign_to_subject(permission.id, subject)
            .await?;
        self.registrar.forget_cached_permissions().await?;

        info!(%subject, permission = %permission.code, "Permission assigned to subject");
        Ok(())
    }

    pub async fn revoke_permission_from_subject(
        &self,
        subject: &SubjectRef,
        permission: impl Into<PermissionRef>,
    ) -> RbacResult<()> {
        let permission = self.permission_for_subject(subject, permission.into()).await?;

        self.registrar
            .repository()
            .unassign_from_subject(permission.id, subject)
            .await?;
        self.registrar.forget_cached_permissions().await?;

        info!(%subject, permission = %permission.code, "Permission revoked from subject");
        Ok(())
    }

    fn ensure_role_guard(&self, subject: &SubjectRef, role: &Role) -> RbacResult<()> {
        let guard_name = self.config.guard_for_subject(&subject.subject_type);
        if role.guard_name != guard_name {
            return Err(RbacError::guard_mismatch(
                role.guard_name.clone(),
                vec![guard_name.to_owned()],
            ));
        }
        Ok(())
    }

    pub async fn assign_role_to_subject(&self, subject: &SubjectRef, role: &Role) -> RbacResult<()> {
        self.ensure_role_guard(subject, role)?;

        self.role_repo.assign_to_subject(role.id, subject).await?;
        self.registrar.forget_cached_permissions().await?;

        info!(%subject, role = %role.code, "Role assigned to subject");
        Ok(())
    }

    pub async fn remove_role_from_subject(
        &self,
        subject: &SubjectRef,
        role: &Role,
    ) -> RbacResult<()> {
        self.role_repo.unassign_from_subject(role.id, subject).await?;
        self.registrar.forget_cached_permissions().await?;

        info!(%subject, role = %role.code, "Role removed from subject");
        Ok(())
    }

    pub async fn subject_roles(&self, subject: &SubjectRef) -> RbacResult<Vec<Role>> {
        self.role_repo.get_subject_roles(subject).await
    }

    /// Permissions assigned directly to `subject` (not through roles).
    pub async fn subject_permissions(&self, subject: &SubjectRef) -> RbacResult<Vec<Permission>> {
        self.registrar
            .repository()
            .get_subject_permissions(subject)
            .await
    }
}

/// Reject a permission whose guard is not one of `guard_names`.
pub(crate) fn ensure_guard(permission: &Permission, guard_names: Vec<String>) -> RbacResult<()> {
    if guard_names.contains(&permission.guard_name) {
        Ok(())
    } else {
        Err(RbacError::guard_mismatch(
            permission.guard_name.clone(),
            guard_names,
        ))
    }
}
