//! `SeaORM` implementations of the core storage collaborators.
//!
//! Stores borrow a connection rather than owning one, so repositories can
//! hand them the open transaction and keep every read and write of an
//! operation in the same unit of work.

pub mod balance;
pub mod join;

pub use balance::SeaBalanceStore;
pub use join::{
    ProjectCategoryStore, RoleNotificationTypeStore, RolePermissionStore, unknown_members,
};
