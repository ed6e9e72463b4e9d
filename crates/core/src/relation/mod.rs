//! Many-to-many membership synchronization.
//!
//! One generic algorithm serves every join table (role ↔ permission,
//! role ↔ notification type, project ↔ category): diff the desired set
//! against the current one and issue only the inserts and deletes that
//! differ.

pub mod error;
pub mod plan;
pub mod policy;
pub mod service;


pub use error::{MembershipError, SyncError};
pub use plan::{SyncOp, SyncPlan};
pub use policy::MembershipRule;
pub use service::{JoinStore, RelationSynchronizer, SyncReport, SyncResult};
