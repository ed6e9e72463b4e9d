//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Each write opens its own transaction and commits only when every
//! synchronization and reconciliation it triggered succeeded.

pub mod addition;
pub mod payment;
pub mod project;
pub mod role;

#[cfg(test)]
mod test_support;

pub use addition::{AdditionChange, AdditionRepository, CreateAdditionInput};
pub use payment::{CreatePaymentInput, PaymentChange, PaymentRepository};
pub use project::{
    CreateProjectInput, PROJECT_CATEGORIES_RULE, ProjectError, ProjectRepository, SavedProject,
    UpdateProjectInput,
};
pub use role::{
    CreateRoleInput, ROLE_NOTIFICATION_TYPES_RULE, ROLE_PERMISSIONS_RULE, RoleError,
    RoleRepository, SavedRole, UpdateRoleInput,
};

/// Joins ids for error messages.
pub(crate) fn display_ids<T: std::fmt::Display>(ids: &[T]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
