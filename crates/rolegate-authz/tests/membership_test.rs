//! Integration tests for role membership checks and grants.

mod common;

use rolegate_authz::{AuthzConfig, PermissionMatcher, PermissionRef};
use rolegate_core::error::RbacError;
use rolegate_core::models::permission::CreatePermission;
use rolegate_core::models::role::CreateRole;

#[tokio::test]
async fn linked_permission_in_same_guard() {
    let service = common::service().await;
    let writer = service
        .create_role(CreateRole::new("writer", Some("web")))
        .await
        .unwrap();
    let edit = service
        .create_permission(CreatePermission::new("edit", Some("web")))
        .await
        .unwrap();
    service
        .create_permission(CreatePermission::new("publish", Some("web")))
        .await
        .unwrap();

    service.give_permission_to_role(&writer, &edit).await.unwrap();

    assert!(service.role_has_permission_to(&writer, "edit").await.unwrap());
    assert!(service.role_has_permission_to(&writer, edit.clone()).await.unwrap());
    assert!(!service.role_has_permission_to(&writer, "publish").await.unwrap());

    service.revoke_permission_from_role(&writer, "edit").await.unwrap();
    assert!(!service.role_has_permission_to(&writer, &edit).await.unwrap());
}

#[tokio::test]
async fn permission_from_another_guard_is_a_mismatch() {
    let service = common::service().await;
    let writer = service
        .create_role(CreateRole::new("writer", Some("web")))
        .await
        .unwrap();
    let api_edit = service
        .create_permission(CreatePermission::new("edit", Some("api")))
        .await
        .unwrap();

    let err = service
        .role_has_permission_to(&writer, &api_edit)
        .await
        .unwrap_err();
    match err {
        RbacError::GuardMismatch { given, expected } => {
            assert_eq!(given, "api");
            assert_eq!(expected, vec!["web".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = service
        .give_permission_to_role(&writer, &api_edit)
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::GuardMismatch { .. }));
}

#[tokio::test]
async fn codes_resolve_in_the_roles_guard() {
    let service = common::service().await;
    let writer = service
        .create_role(CreateRole::new("writer", Some("web")))
        .await
        .unwrap();
    service
        .create_permission(CreatePermission::new("edit", Some("api")))
        .await
        .unwrap();

    let err = service
        .role_has_permission_to(&writer, "edit")
        .await
        .unwrap_err();
    match err {
        RbacError::DoesNotExist { key, guard, .. } => {
            assert_eq!(key, "edit");
            assert_eq!(guard, "web");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn sync_replaces_the_granted_set() {
    let service = common::service().await;
    let writer = service
        .create_role(CreateRole::new("writer", Some("web")))
        .await
        .unwrap();
    for code in ["edit", "publish", "view"] {
        service.find_or_create_permission(code, None).await.unwrap();
    }
    service.give_permission_to_role(&writer, "edit").await.unwrap();
    service.give_permission_to_role(&writer, "publish").await.unwrap();

    service
        .sync_role_permissions(&writer, ["publish", "view", "view"])
        .await
        .unwrap();

    assert!(!service.role_has_permission_to(&writer, "edit").await.unwrap());
    assert!(service.role_has_permission_to(&writer, "publish").await.unwrap());
    assert!(service.role_has_permission_to(&writer, "view").await.unwrap());
}

#[tokio::test]
async fn sync_with_unknown_code_changes_nothing() {
    let service = common::service().await;
    let writer = service
        .create_role(CreateRole::new("writer", Some("web")))
        .await
        .unwrap();
    service.find_or_create_permission("edit", None).await.unwrap();
    service.give_permission_to_role(&writer, "edit").await.unwrap();

    let err = service
        .sync_role_permissions(&writer, ["missing"])
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::DoesNotExist { .. }));
    assert!(service.role_has_permission_to(&writer, "edit").await.unwrap());
}

#[tokio::test]
async fn wildcard_patterns_grant_unlisted_codes() {
    let config = AuthzConfig {
        enable_wildcard_permission: true,
        ..AuthzConfig::default()
    };
    let service = common::service_with(config).await;
    let editor = service
        .create_role(CreateRole::new("editor", Some("web")))
        .await
        .unwrap();
    service
        .find_or_create_permission("articles.*", None)
        .await
        .unwrap();
    service
        .find_or_create_permission("posts.view,edit", None)
        .await
        .unwrap();
    service.give_permission_to_role(&editor, "articles.*").await.unwrap();
    service
        .give_permission_to_role(&editor, "posts.view,edit")
        .await
        .unwrap();

    assert!(service.role_has_permission_to(&editor, "articles.edit").await.unwrap());
    assert!(service.role_has_permission_to(&editor, "posts.edit").await.unwrap());
    assert!(!service.role_has_permission_to(&editor, "posts.delete").await.unwrap());
    assert!(!service.role_has_permission_to(&editor, "users.edit").await.unwrap());

    let api_articles = service
        .create_permission(CreatePermission::new("articles.edit", Some("api")))
        .await
        .unwrap();
    let err = service
        .role_has_permission_to(&editor, PermissionRef::from(api_articles))
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::GuardMismatch { .. }));
}

struct PrefixMatcher;

impl PermissionMatcher for PrefixMatcher {
    fn implies(&self, granted: &str, requested: &str) -> bool {
        requested.starts_with(granted)
    }
}

#[tokio::test]
async fn custom_matcher_replaces_wildcard_rules() {
    let config = AuthzConfig {
        enable_wildcard_permission: true,
        ..AuthzConfig::default()
    };
    let service = common::service_with(config).await.with_matcher(PrefixMatcher);
    let admin = service
        .create_role(CreateRole::new("admin", Some("web")))
        .await
        .unwrap();
    service.find_or_create_permission("manage", None).await.unwrap();
    service.give_permission_to_role(&admin, "manage").await.unwrap();

    assert!(service.role_has_permission_to(&admin, "manage-users").await.unwrap());
    assert!(!service.role_has_permission_to(&admin, "view").await.unwrap());
}
