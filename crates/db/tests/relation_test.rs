//! Join-table synchronization against a live Postgres database.

mod common;

use std::collections::BTreeSet;

use sea_orm::EntityTrait;
use tally_core::relation::MembershipError;
use tally_db::entities::roles;
use tally_db::entities::sea_orm_active_enums::NotificationsScope;
use tally_db::repositories::{
    CreateProjectInput, CreateRoleInput, ProjectError, ProjectRepository, RoleError,
    RoleRepository, UpdateProjectInput, UpdateRoleInput,
};
use tally_shared::AppError;
use tally_shared::types::{CategoryId, PermissionId, ProjectId, RoleId};
use uuid::Uuid;

async fn new_role(repo: &RoleRepository, permissions: Vec<PermissionId>) -> RoleId {
    let saved = repo
        .create_role(CreateRoleInput {
            name: format!("role-{}", Uuid::new_v4()),
            notifications_scope: NotificationsScope::SelfOnly,
            permission_ids: permissions,
            notification_type_ids: Vec::new(),
        })
        .await
        .expect("Failed to create role");
    RoleId::from_uuid(saved.role.id)
}

#[tokio::test]
async fn test_role_permissions_converge() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut p = Vec::new();
    for _ in 0..4 {
        p.push(common::seed_permission(&db).await.unwrap());
    }
    let repo = RoleRepository::new(db);
    let role = new_role(&repo, vec![p[0], p[1], p[2]]).await;

    let saved = repo
        .update_role(
            role,
            UpdateRoleInput {
                permission_ids: Some(vec![p[1], p[2], p[3]]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let report = saved.permissions.unwrap();
    assert_eq!(report.added, vec![p[3]]);
    assert_eq!(report.removed, vec![p[0]]);
    assert_eq!(
        repo.permission_ids(role).await.unwrap(),
        BTreeSet::from([p[1], p[2], p[3]])
    );
}

#[tokio::test]
async fn test_resubmitting_same_permissions_writes_nothing() {
    let Some(db) = common::connect().await else {
        return;
    };
    let a = common::seed_permission(&db).await.unwrap();
    let b = common::seed_permission(&db).await.unwrap();
    let repo = RoleRepository::new(db);
    let role = new_role(&repo, vec![a, b]).await;

    let saved = repo
        .update_role(
            role,
            UpdateRoleInput {
                permission_ids: Some(vec![b, a, a]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(saved.permissions.unwrap().is_noop());
}

#[tokio::test]
async fn test_emptying_permissions_is_rejected_and_nothing_changes() {
    let Some(db) = common::connect().await else {
        return;
    };
    let a = common::seed_permission(&db).await.unwrap();
    let repo = RoleRepository::new(db);
    let role = new_role(&repo, vec![a]).await;

    let err = repo
        .update_role(
            role,
            UpdateRoleInput {
                name: Some("renamed".to_string()),
                permission_ids: Some(Vec::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RoleError::Membership(MembershipError::TooFewMembers { .. })
    ));
    assert_eq!(repo.permission_ids(role).await.unwrap(), BTreeSet::from([a]));
    assert_ne!(repo.find_by_id(role).await.unwrap().unwrap().name, "renamed");
}

#[tokio::test]
async fn test_unknown_permission_leaves_role_untouched() {
    let Some(db) = common::connect().await else {
        return;
    };
    let a = common::seed_permission(&db).await.unwrap();
    let b = common::seed_permission(&db).await.unwrap();
    let repo = RoleRepository::new(db.clone());
    let role = new_role(&repo, vec![a]).await;

    let dangling = PermissionId::from_uuid(Uuid::from_u128(u128::MAX));

    let err = repo
        .update_role(
            role,
            UpdateRoleInput {
                name: Some(format!("renamed-{}", Uuid::new_v4())),
                permission_ids: Some(vec![b, dangling]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(&err, RoleError::UnknownPermissions(ids) if ids == &vec![dangling]));
    assert!(matches!(AppError::from(err), AppError::Validation(_)));

    assert_eq!(repo.permission_ids(role).await.unwrap(), BTreeSet::from([a]));
    let stored = roles::Entity::find_by_id(role.into_inner())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.name.starts_with("renamed-"));
}

#[tokio::test]
async fn test_notification_types_may_be_emptied() {
    let Some(db) = common::connect().await else {
        return;
    };
    let perm = common::seed_permission(&db).await.unwrap();
    let kind = common::seed_notification_type(&db).await.unwrap();
    let repo = RoleRepository::new(db);
    let role = new_role(&repo, vec![perm]).await;

    repo.update_role(
        role,
        UpdateRoleInput {
            notification_type_ids: Some(vec![kind]),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(
        repo.notification_type_ids(role).await.unwrap(),
        BTreeSet::from([kind])
    );

    repo.update_role(
        role,
        UpdateRoleInput {
            notification_type_ids: Some(Vec::new()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(repo.notification_type_ids(role).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_project_categories_converge() {
    let Some(db) = common::connect().await else {
        return;
    };
    let first = common::seed_category(&db).await.unwrap();
    let second = common::seed_category(&db).await.unwrap();
    let repo = ProjectRepository::new(db);

    let saved = repo
        .create_project(CreateProjectInput {
            name: "Categorized".to_string(),
            budget: None,
            category_ids: vec![first],
        })
        .await
        .unwrap();
    let id = ProjectId::from_uuid(saved.project.id);

    let updated = repo
        .update_project(
            id,
            UpdateProjectInput {
                category_ids: Some(vec![second]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let report = updated.categories.unwrap();
    assert_eq!(report.added, vec![second]);
    assert_eq!(report.removed, vec![first]);
    assert!(updated.reconciliation.is_none());
    assert_eq!(repo.category_ids(id).await.unwrap(), BTreeSet::from([second]));
}

#[tokio::test]
async fn test_unknown_category_creates_no_project() {
    let Some(db) = common::connect().await else {
        return;
    };
    let known = common::seed_category(&db).await.unwrap();
    let missing = CategoryId::new();
    let repo = ProjectRepository::new(db);
    let name = format!("rejected-{}", Uuid::new_v4());

    let err = repo
        .create_project(CreateProjectInput {
            name: name.clone(),
            budget: None,
            category_ids: vec![known, missing],
        })
        .await
        .unwrap_err();

    assert!(matches!(&err, ProjectError::UnknownCategories(ids) if ids == &vec![missing]));
    assert!(matches!(AppError::from(err), AppError::Validation(_)));
}
