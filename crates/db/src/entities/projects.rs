//! `SeaORM` Entity for projects table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub budget: Option<Decimal>,
    /// Derived: budget + additions - payments. Written only by reconciliation.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub remaining_amount: Decimal,
    /// Optimistic concurrency version, bumped on every balance or budget write.
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
    #[sea_orm(has_many = "super::additions::Entity")]
    Additions,
    #[sea_orm(has_many = "super::project_categories::Entity")]
    ProjectCategories,
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::additions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Additions.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        super::project_categories::Relation::Categories.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::project_categories::Relation::Projects.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
