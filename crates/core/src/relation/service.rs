//! Relation synchronizer converging a join table to a desired member set.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::SyncError;
use super::plan::{SyncOp, SyncPlan};
use crate::store::StoreError;

/// Storage collaborator for one join table (role ↔ permission, etc.).
///
/// This trait is implemented by the db crate, once per join table.
pub trait JoinStore: Send + Sync {
    /// Owning side of the relation.
    type Owner: Copy + fmt::Display + Send + Sync;
    /// Member side of the relation.
    type Member: Copy + Ord + fmt::Debug + fmt::Display + Send + Sync;

    /// Name of the join table, used in logs and errors.
    fn relation(&self) -> &'static str;

    /// Lists the members currently joined to `owner`.
    fn list_members(
        &self,
        owner: Self::Owner,
    ) -> impl Future<Output = Result<BTreeSet<Self::Member>, StoreError>> + Send;

    /// Inserts the `(owner, member)` row.
    fn add_member(
        &self,
        owner: Self::Owner,
        member: Self::Member,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes the `(owner, member)` row.
    fn remove_member(
        &self,
        owner: Self::Owner,
        member: Self::Member,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// What a successful synchronization did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport<M> {
    /// Members inserted, ascending.
    pub added: Vec<M>,
    /// Members deleted, ascending.
    pub removed: Vec<M>,
    /// Members present before and after, left untouched.
    pub unchanged: usize,
}

impl<M> SyncReport<M> {
    /// Number of writes issued.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Result type for synchronizations over a given store.
pub type SyncResult<S> =
    Result<SyncReport<<S as JoinStore>::Member>, SyncError<<S as JoinStore>::Member>>;

/// Converges one owner's membership in a join table with the minimum number of writes.
///
/// Holds no state between calls and performs no domain checks: whether an
/// owner may end up with zero members is decided by the caller
/// (see [`MembershipRule`](super::policy::MembershipRule)).
#[derive(Debug, Clone)]
pub struct RelationSynchronizer<S> {
    store: S,
}

impl<S: JoinStore> RelationSynchronizer<S> {
    /// Creates a synchronizer over the given store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Diffs `desired` against `current` without touching storage.
    ///
    /// Duplicate ids in either input collapse into one member.
    #[must_use]
    pub fn plan<D, C>(desired: D, current: C) -> SyncPlan<S::Member>
    where
        D: IntoIterator<Item = S::Member>,
        C: IntoIterator<Item = S::Member>,
    {
        let desired: BTreeSet<_> = desired.into_iter().collect();
        let current: BTreeSet<_> = current.into_iter().collect();
        SyncPlan::diff(&desired, &current)
    }

    /// Moves `owner` from the caller-supplied `current` membership to `desired`.
    ///
    /// Issues exactly `|desired Δ current|` writes: adds first, then removes,
    /// each ascending by member. Members in both sets are not written.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Write` on the first failed write, listing what was
    /// applied and what was never attempted. Applied writes are not undone.
    pub async fn synchronize<D, C>(&self, owner: S::Owner, desired: D, current: C) -> SyncResult<S>
    where
        D: IntoIterator<Item = S::Member>,
        C: IntoIterator<Item = S::Member>,
    {
        let plan = Self::plan(desired, current);
        self.apply(owner, &plan).await
    }

    /// Reads the current membership from the store, then synchronizes.
    ///
    /// Meant to run inside the caller's transaction so the read and the
    /// writes see the same snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Read` if the current membership cannot be read,
    /// otherwise the errors of [`RelationSynchronizer::synchronize`].
    pub async fn converge<D>(&self, owner: S::Owner, desired: D) -> SyncResult<S>
    where
        D: IntoIterator<Item = S::Member>,
    {
        let current = self
            .store
            .list_members(owner)
            .await
            .map_err(|source| SyncError::Read {
                relation: self.store.relation(),
                source,
            })?;
        self.synchronize(owner, desired, current).await
    }

    async fn apply(&self, owner: S::Owner, plan: &SyncPlan<S::Member>) -> SyncResult<S> {
        let relation = self.store.relation();

        if plan.is_noop() {
            debug!(relation, %owner, unchanged = plan.unchanged.len(), "Membership already in sync");
            return Ok(SyncReport {
                added: Vec::new(),
                removed: Vec::new(),
                unchanged: plan.unchanged.len(),
            });
        }

        debug!(
            relation,
            %owner,
            to_add = plan.to_add.len(),
            to_remove = plan.to_remove.len(),
            unchanged = plan.unchanged.len(),
            "Synchronizing membership"
        );

        let operations = plan.operations();
        for (index, op) in operations.iter().enumerate() {
            let outcome = match *op {
                SyncOp::Add(member) => self.store.add_member(owner, member).await,
                SyncOp::Remove(member) => self.store.remove_member(owner, member).await,
            };

            if let Err(source) = outcome {
                warn!(relation, %owner, failed = %op, applied = index, "Membership write failed");
                return Err(SyncError::Write {
                    relation,
                    failed: *op,
                    applied: operations[..index].to_vec(),
                    pending: operations[index + 1..].to_vec(),
                    source,
                });
            }
        }

        info!(
            relation,
            %owner,
            added = plan.to_add.len(),
            removed = plan.to_remove.len(),
            "Membership synchronized"
        );

        Ok(SyncReport {
            added: plan.to_add.iter().copied().collect(),
            removed: plan.to_remove.iter().copied().collect(),
            unchanged: plan.unchanged.len(),
        })
    }
}
