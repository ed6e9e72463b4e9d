//! Role repository for database operations.
//!
//! Roles own two memberships: permissions, which must never be empty, and
//! notification types, which may be. Desired sets are checked against
//! their rules before the transaction opens, and against the member tables
//! inside it.

use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QuerySelect, Set,
    TransactionTrait,
};
use tally_core::relation::{
    JoinStore, MembershipError, MembershipRule, RelationSynchronizer, SyncError, SyncReport,
};
use tally_shared::AppError;
use tally_shared::types::{NotificationTypeId, PermissionId, RoleId};
use tracing::info;

use super::display_ids;
use crate::entities::sea_orm_active_enums::NotificationsScope;
use crate::entities::{notification_types, permissions, roles};
use crate::stores::{RoleNotificationTypeStore, RolePermissionStore, unknown_members};

/// A role must keep at least one permission.
pub const ROLE_PERMISSIONS_RULE: MembershipRule = MembershipRule::at_least_one("role_permissions");

/// A role may subscribe to no notification types.
pub const ROLE_NOTIFICATION_TYPES_RULE: MembershipRule =
    MembershipRule::unrestricted("role_notification_types");

/// Error types for role operations.
#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    /// Role not found.
    #[error("Role not found: {0}")]
    NotFound(RoleId),

    /// Role name is empty.
    #[error("Role name cannot be empty")]
    EmptyName,

    /// A desired set violates its membership rule.
    #[error(transparent)]
    Membership(#[from] MembershipError),

    /// Desired permissions that do not exist.
    #[error("Unknown permissions: {}", display_ids(.0))]
    UnknownPermissions(Vec<PermissionId>),

    /// Desired notification types that do not exist.
    #[error("Unknown notification types: {}", display_ids(.0))]
    UnknownNotificationTypes(Vec<NotificationTypeId>),

    /// Permission synchronization failed. The transaction was rolled back.
    #[error("{}", .0.rolled_back())]
    Permissions(#[from] SyncError<PermissionId>),

    /// Notification type synchronization failed. The transaction was rolled back.
    #[error("{}", .0.rolled_back())]
    NotificationTypes(#[from] SyncError<NotificationTypeId>),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<RoleError> for AppError {
    fn from(err: RoleError) -> Self {
        match err {
            err @ RoleError::NotFound(_) => Self::NotFound(err.to_string()),
            err @ (RoleError::EmptyName
            | RoleError::UnknownPermissions(_)
            | RoleError::UnknownNotificationTypes(_)) => Self::Validation(err.to_string()),
            RoleError::Membership(e) => e.into(),
            RoleError::Permissions(e) => Self::Database(e.rolled_back()),
            RoleError::NotificationTypes(e) => Self::Database(e.rolled_back()),
            RoleError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating a role.
#[derive(Debug, Clone)]
pub struct CreateRoleInput {
    /// Role name.
    pub name: String,
    /// Which notifications members of the role receive.
    pub notifications_scope: NotificationsScope,
    /// Permissions granted. At least one.
    pub permission_ids: Vec<PermissionId>,
    /// Notification types subscribed to.
    pub notification_type_ids: Vec<NotificationTypeId>,
}

/// Input for updating a role. `None` fields are left untouched; supplied
/// sets replace the current membership entirely.
#[derive(Debug, Clone, Default)]
pub struct UpdateRoleInput {
    /// New name.
    pub name: Option<String>,
    /// New notification scope.
    pub notifications_scope: Option<NotificationsScope>,
    /// Full desired permission set.
    pub permission_ids: Option<Vec<PermissionId>>,
    /// Full desired notification type set.
    pub notification_type_ids: Option<Vec<NotificationTypeId>>,
}

/// Outcome of a role write.
#[derive(Debug, Clone)]
pub struct SavedRole {
    /// Role row after the write.
    pub role: roles::Model,
    /// Permission changes, if permissions were supplied.
    pub permissions: Option<SyncReport<PermissionId>>,
    /// Notification type changes, if notification types were supplied.
    pub notification_types: Option<SyncReport<NotificationTypeId>>,
}

/// Role repository.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    db: DatabaseConnection,
}

impl RoleRepository {
    /// Creates a new role repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a role by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: RoleId) -> Result<Option<roles::Model>, RoleError> {
        Ok(roles::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?)
    }

    /// Lists the permissions granted to a role.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn permission_ids(&self, id: RoleId) -> Result<BTreeSet<PermissionId>, RoleError> {
        let store = RolePermissionStore::new(&self.db);
        store.list_members(id).await.map_err(|source| {
            RoleError::Permissions(SyncError::Read {
                relation: store.relation(),
                source,
            })
        })
    }

    /// Lists the notification types a role subscribes to.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn notification_type_ids(
        &self,
        id: RoleId,
    ) -> Result<BTreeSet<NotificationTypeId>, RoleError> {
        let store = RoleNotificationTypeStore::new(&self.db);
        store.list_members(id).await.map_err(|source| {
            RoleError::NotificationTypes(SyncError::Read {
                relation: store.relation(),
                source,
            })
        })
    }

    /// Creates a role with its permissions and notification types.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is empty
    /// - No permission is supplied
    /// - A permission or notification type does not exist
    /// - A membership write fails
    /// - The database operation fails
    pub async fn create_role(&self, input: CreateRoleInput) -> Result<SavedRole, RoleError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(RoleError::EmptyName);
        }
        let permissions: BTreeSet<PermissionId> = input.permission_ids.into_iter().collect();
        let notification_types: BTreeSet<NotificationTypeId> =
            input.notification_type_ids.into_iter().collect();
        ROLE_PERMISSIONS_RULE.check(&permissions)?;
        ROLE_NOTIFICATION_TYPES_RULE.check(&notification_types)?;

        let txn = self.db.begin().await?;
        check_permissions_exist(&txn, &permissions).await?;
        check_notification_types_exist(&txn, &notification_types).await?;

        let now = Utc::now().into();
        let role_id = RoleId::new();

        let role = roles::ActiveModel {
            id: Set(role_id.into_inner()),
            name: Set(name),
            notifications_scope: Set(input.notifications_scope),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let permission_report = RelationSynchronizer::new(RolePermissionStore::new(&txn))
            .synchronize(role_id, permissions, BTreeSet::new())
            .await?;
        let notification_report =
            RelationSynchronizer::new(RoleNotificationTypeStore::new(&txn))
                .synchronize(role_id, notification_types, BTreeSet::new())
                .await?;

        txn.commit().await?;

        info!(
            %role_id,
            permissions = permission_report.added.len(),
            notification_types = notification_report.added.len(),
            "Role created"
        );

        Ok(SavedRole {
            role,
            permissions: Some(permission_report),
            notification_types: Some(notification_report),
        })
    }

    /// Updates a role and converges any supplied membership sets.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The role does not exist
    /// - The name is empty
    /// - The permission set is supplied and empty
    /// - A permission or notification type does not exist
    /// - A membership write fails
    /// - The database operation fails
    pub async fn update_role(
        &self,
        id: RoleId,
        input: UpdateRoleInput,
    ) -> Result<SavedRole, RoleError> {
        let name = match input.name {
            Some(name) if name.trim().is_empty() => return Err(RoleError::EmptyName),
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };
        let permissions: Option<BTreeSet<PermissionId>> = input
            .permission_ids
            .map(|ids| ids.into_iter().collect());
        let notification_types: Option<BTreeSet<NotificationTypeId>> = input
            .notification_type_ids
            .map(|ids| ids.into_iter().collect());
        if let Some(permissions) = &permissions {
            ROLE_PERMISSIONS_RULE.check(permissions)?;
        }
        if let Some(notification_types) = &notification_types {
            ROLE_NOTIFICATION_TYPES_RULE.check(notification_types)?;
        }

        let txn = self.db.begin().await?;

        let existing = roles::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(RoleError::NotFound(id))?;

        if let Some(permissions) = &permissions {
            check_permissions_exist(&txn, permissions).await?;
        }
        if let Some(notification_types) = &notification_types {
            check_notification_types_exist(&txn, notification_types).await?;
        }

        let mut active: roles::ActiveModel = existing.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(scope) = input.notifications_scope {
            active.notifications_scope = Set(scope);
        }
        active.updated_at = Set(Utc::now().into());
        let role = active.update(&txn).await?;

        let permission_report = match permissions {
            Some(permissions) => Some(
                RelationSynchronizer::new(RolePermissionStore::new(&txn))
                    .converge(id, permissions)
                    .await?,
            ),
            None => None,
        };
        let notification_report = match notification_types {
            Some(notification_types) => Some(
                RelationSynchronizer::new(RoleNotificationTypeStore::new(&txn))
                    .converge(id, notification_types)
                    .await?,
            ),
            None => None,
        };

        txn.commit().await?;

        Ok(SavedRole {
            role,
            permissions: permission_report,
            notification_types: notification_report,
        })
    }
}

async fn check_permissions_exist<C: ConnectionTrait>(
    conn: &C,
    desired: &BTreeSet<PermissionId>,
) -> Result<(), RoleError> {
    let unknown = unknown_members::<permissions::Entity, _, _>(
        conn,
        permissions::Column::Id,
        |row| row.id,
        desired,
    )
    .await?;
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(RoleError::UnknownPermissions(unknown))
    }
}

async fn check_notification_types_exist<C: ConnectionTrait>(
    conn: &C,
    desired: &BTreeSet<NotificationTypeId>,
) -> Result<(), RoleError> {
    let unknown = unknown_members::<notification_types::Entity, _, _>(
        conn,
        notification_types::Column::Id,
        |row| row.id,
        desired,
    )
    .await?;
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(RoleError::UnknownNotificationTypes(unknown))
    }
}
