//! Relation synchronization error types.

use std::fmt;

use tally_shared::AppError;
use thiserror::Error;

use super::plan::SyncOp;
use crate::store::StoreError;

/// Errors raised while synchronizing a join table.
///
/// A failed write stops the call; writes already applied stay applied unless
/// the caller runs the synchronization inside its own transaction.
#[derive(Debug, Error)]
pub enum SyncError<M: fmt::Debug + fmt::Display> {
    /// Reading the current membership failed. Nothing was written.
    #[error("Failed to read current members of {relation}: {source}")]
    Read {
        /// Join relation name.
        relation: &'static str,
        /// Underlying storage error.
        #[source]
        source: StoreError,
    },

    /// A write failed part-way through.
    #[error(
        "Failed to {failed} on {relation} after {} applied writes ({} pending): {source}",
        .applied.len(),
        .pending.len()
    )]
    Write {
        /// Join relation name.
        relation: &'static str,
        /// The write that failed.
        failed: SyncOp<M>,
        /// Writes that succeeded before the failure, in order.
        applied: Vec<SyncOp<M>>,
        /// Writes that were never attempted, in order.
        pending: Vec<SyncOp<M>>,
        /// Underlying storage error.
        #[source]
        source: StoreError,
    },
}

impl<M: fmt::Debug + fmt::Display> SyncError<M> {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "RELATION_READ_FAILED",
            Self::Write { .. } => "RELATION_PARTIALLY_APPLIED",
        }
    }

    /// Writes that reached storage before the failure.
    #[must_use]
    pub fn applied(&self) -> &[SyncOp<M>] {
        match self {
            Self::Read { .. } => &[],
            Self::Write { applied, .. } => applied,
        }
    }

    /// Describes the failure for a caller whose transaction rolled back, so
    /// none of the applied writes survived.
    #[must_use]
    pub fn rolled_back(&self) -> String {
        match self {
            Self::Read { .. } => self.to_string(),
            Self::Write {
                relation,
                failed,
                source,
                ..
            } => format!("Failed to {failed} on {relation}, no changes were kept: {source}"),
        }
    }
}

impl<M: fmt::Debug + fmt::Display> From<SyncError<M>> for AppError {
    fn from(err: SyncError<M>) -> Self {
        Self::Database(err.to_string())
    }
}

/// Membership policy violations, checked before any write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MembershipError {
    /// The desired set is smaller than the relation allows.
    #[error("{relation} requires at least {required} member(s), got {actual}")]
    TooFewMembers {
        /// Join relation name.
        relation: &'static str,
        /// Minimum number of members.
        required: usize,
        /// Members supplied.
        actual: usize,
    },
}

impl MembershipError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TooFewMembers { .. } => "TOO_FEW_MEMBERS",
        }
    }
}

impl From<MembershipError> for AppError {
    fn from(err: MembershipError) -> Self {
        Self::BusinessRule(err.to_string())
    }
}
