//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Every write that touches
//! permissions, roles, or their pivots must be followed by a permission
//! cache invalidation; the repositories themselves know nothing about the
//! cache.

use uuid::Uuid;

use crate::error::RbacResult;
use crate::models::{
    permission::{CreatePermission, Permission},
    role::{CreateRole, Role},
    subject::SubjectRef,
};

pub trait PermissionRepository: Send + Sync {
    /// Insert a permission. `input.guard_name` must already be resolved.
    fn create(&self, input: CreatePermission)
    -> impl Future<Output = RbacResult<Permission>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RbacResult<Permission>> + Send;

    fn find_by_code(
        &self,
        code: &str,
        guard_name: &str,
    ) -> impl Future<Output = RbacResult<Option<Permission>>> + Send;

    /// Delete a permission together with every pivot that references it.
    fn delete(&self, id: Uuid) -> impl Future<Output = RbacResult<()>> + Send;

    /// Every permission with its granted roles attached, fetched in a
    /// fixed number of queries regardless of the dataset size.
    fn list_with_roles(&self) -> impl Future<Output = RbacResult<Vec<Permission>>> + Send;

    /// Grant a permission to a role. Granting twice is a no-op.
    fn grant_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = RbacResult<()>> + Send;

    fn revoke_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = RbacResult<()>> + Send;

    fn get_role_permissions(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = RbacResult<Vec<Permission>>> + Send;

    /// Attach a permission directly to a subject. Attaching twice is a no-op.
    fn assign_to_subject(
        &self,
        permission_id: Uuid,
        subject: &SubjectRef,
    ) -> impl Future<Output = RbacResult<()>> + Send;

    fn unassign_from_subject(
        &self,
        permission_id: Uuid,
        subject: &SubjectRef,
    ) -> impl Future<Output = RbacResult<()>> + Send;

    fn get_subject_permissions(
        &self,
        subject: &SubjectRef,
    ) -> impl Future<Output = RbacResult<Vec<Permission>>> + Send;
}

pub trait RoleRepository: Send + Sync {
    /// Insert a role. `input.guard_name` must already be resolved.
    fn create(&self, input: CreateRole) -> impl Future<Output = RbacResult<Role>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RbacResult<Role>> + Send;

    fn find_by_code(
        &self,
        code: &str,
        guard_name: &str,
    ) -> impl Future<Output = RbacResult<Option<Role>>> + Send;

    /// Match `code_or_id` against either the code or the identity of a
    /// role under `guard_name`.
    fn find_by_code_or_id(
        &self,
        code_or_id: &str,
        guard_name: &str,
    ) -> impl Future<Output = RbacResult<Option<Role>>> + Send;

    /// Delete a role together with its grants and subject assignments.
    fn delete(&self, id: Uuid) -> impl Future<Output = RbacResult<()>> + Send;

    /// Assign a role to a subject. Assigning twice is a no-op.
    fn assign_to_subject(
        &self,
        role_id: Uuid,
        subject: &SubjectRef,
    ) -> impl Future<Output = RbacResult<()>> + Send;

    fn unassign_from_subject(
        &self,
        role_id: Uuid,
        subject: &SubjectRef,
    ) -> impl Future<Output = RbacResult<()>> + Send;

    fn get_subject_roles(
        &self,
        subject: &SubjectRef,
    ) -> impl Future<Output = RbacResult<Vec<Role>>> + Send;
}
