//! `SeaORM` entity definitions.

pub mod additions;
pub mod categories;
pub mod notification_types;
pub mod payments;
pub mod permissions;
pub mod project_categories;
pub mod projects;
pub mod role_notification_types;
pub mod role_permissions;
pub mod roles;
pub mod sea_orm_active_enums;
