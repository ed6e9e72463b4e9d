//! `SeaORM` Entity for role_notification_types join table (role ↔ notification type).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "role_notification_types")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub role_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub notification_type_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::roles::Entity",
        from = "Column::RoleId",
        to = "super::roles::Column::Id",
        on_delete = "Cascade"
    )]
    Roles,
    #[sea_orm(
        belongs_to = "super::notification_types::Entity",
        from = "Column::NotificationTypeId",
        to = "super::notification_types::Column::Id",
        on_delete = "Cascade"
    )]
    NotificationTypes,
}

impl Related<super::roles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Roles.def()
    }
}

impl Related<super::notification_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NotificationTypes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
