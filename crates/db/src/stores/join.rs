//! Join-table stores, one per many-to-many relation.

use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use tally_core::relation::JoinStore;
use tally_core::store::StoreError;
use tally_shared::types::{CategoryId, NotificationTypeId, PermissionId, ProjectId, RoleId};
use uuid::Uuid;

use crate::entities::{project_categories, role_notification_types, role_permissions};

macro_rules! join_store {
    (
        $(#[$meta:meta])*
        $name:ident {
            entity: $entity:ident,
            owner: $owner:ty => ($owner_field:ident, $owner_col:ident),
            member: $member:ty => ($member_field:ident, $member_col:ident) $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'c, C> {
            conn: &'c C,
        }

        impl<'c, C: ConnectionTrait> $name<'c, C> {
            /// Creates a store reading and writing through `conn`.
            #[must_use]
            pub const fn new(conn: &'c C) -> Self {
                Self { conn }
            }
        }

        impl<C: ConnectionTrait> JoinStore for $name<'_, C> {
            type Owner = $owner;
            type Member = $member;

            fn relation(&self) -> &'static str {
                stringify!($entity)
            }

            async fn list_members(&self, owner: $owner) -> Result<BTreeSet<$member>, StoreError> {
                let rows = $entity::Entity::find()
                    .filter($entity::Column::$owner_col.eq(owner.into_inner()))
                    .all(self.conn)
                    .await
                    .map_err(StoreError::database)?;

                Ok(rows
                    .into_iter()
                    .map(|row| <$member>::from_uuid(row.$member_field))
                    .collect())
            }

            async fn add_member(&self, owner: $owner, member: $member) -> Result<(), StoreError> {
                let row = $entity::ActiveModel {
                    $owner_field: Set(owner.into_inner()),
                    $member_field: Set(member.into_inner()),
                    created_at: Set(Utc::now().into()),
                };

                $entity::Entity::insert(row)
                    .exec_without_returning(self.conn)
                    .await
                    .map_err(StoreError::database)?;
                Ok(())
            }

            async fn remove_member(&self, owner: $owner, member: $member) -> Result<(), StoreError> {
                $entity::Entity::delete_many()
                    .filter($entity::Column::$owner_col.eq(owner.into_inner()))
                    .filter($entity::Column::$member_col.eq(member.into_inner()))
                    .exec(self.conn)
                    .await
                    .map_err(StoreError::database)?;
                Ok(())
            }
        }
    };
}

join_store! {
    /// Role ↔ permission memberships.
    RolePermissionStore {
        entity: role_permissions,
        owner: RoleId => (role_id, RoleId),
        member: PermissionId => (permission_id, PermissionId),
    }
}

join_store! {
    /// Role ↔ notification type memberships.
    RoleNotificationTypeStore {
        entity: role_notification_types,
        owner: RoleId => (role_id, RoleId),
        member: NotificationTypeId => (notification_type_id, NotificationTypeId),
    }
}

join_store! {
    /// Project ↔ category memberships.
    ProjectCategoryStore {
        entity: project_categories,
        owner: ProjectId => (project_id, ProjectId),
        member: CategoryId => (category_id, CategoryId),
    }
}

/// Returns the ids in `desired` that have no row in the member table `E`,
/// in ascending order. An empty set costs no query.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn unknown_members<E, M, C>(
    conn: &C,
    id_column: E::Column,
    id_of: fn(&E::Model) -> Uuid,
    desired: &BTreeSet<M>,
) -> Result<Vec<M>, DbErr>
where
    E: EntityTrait,
    M: Copy + Ord + Into<Uuid>,
    C: ConnectionTrait,
{
    if desired.is_empty() {
        return Ok(Vec::new());
    }

    let found: BTreeSet<Uuid> = E::find()
        .filter(id_column.is_in(desired.iter().map(|&id| Into::<Uuid>::into(id))))
        .all(conn)
        .await?
        .iter()
        .map(id_of)
        .collect();

    Ok(desired
        .iter()
        .copied()
        .filter(|&id| !found.contains(&id.into()))
        .collect())
}
