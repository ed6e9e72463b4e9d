//! `SeaORM` active enums mapped to PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which notifications a role receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "notifications_scope")]
#[serde(rename_all = "snake_case")]
pub enum NotificationsScope {
    /// Notifications about every record.
    #[sea_orm(string_value = "all")]
    All,
    /// Only notifications about the user's own records.
    #[sea_orm(string_value = "self")]
    #[serde(rename = "self")]
    SelfOnly,
}

/// Kind of access a permission grants on a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "permission_type")]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Full access.
    #[sea_orm(string_value = "all")]
    All,
    /// Edit existing records.
    #[sea_orm(string_value = "edit")]
    Edit,
    /// Create records.
    #[sea_orm(string_value = "create")]
    Create,
    /// Read-only access.
    #[sea_orm(string_value = "view")]
    View,
    /// Delete records.
    #[sea_orm(string_value = "delete")]
    Delete,
}
