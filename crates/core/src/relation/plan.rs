//! Set difference between desired and current membership.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// A single join-table write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "member", rename_all = "snake_case")]
pub enum SyncOp<M> {
    /// Insert the `(owner, member)` row.
    Add(M),
    /// Delete the `(owner, member)` row.
    Remove(M),
}

impl<M: Copy> SyncOp<M> {
    /// The member this write targets.
    #[must_use]
    pub fn member(&self) -> M {
        match *self {
            Self::Add(member) | Self::Remove(member) => member,
        }
    }
}

impl<M: fmt::Display> fmt::Display for SyncOp<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(member) => write!(f, "add {member}"),
            Self::Remove(member) => write!(f, "remove {member}"),
        }
    }
}

/// The writes needed to move a relation from `current` to `desired`.
///
/// `to_add` and `to_remove` are disjoint by construction; members in both
/// input sets land in `unchanged` and are never written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan<M: Ord> {
    /// `desired - current`.
    pub to_add: BTreeSet<M>,
    /// `current - desired`.
    pub to_remove: BTreeSet<M>,
    /// `desired ∩ current`.
    pub unchanged: BTreeSet<M>,
}

impl<M: Ord + Copy> SyncPlan<M> {
    /// Diffs two membership sets.
    #[must_use]
    pub fn diff(desired: &BTreeSet<M>, current: &BTreeSet<M>) -> Self {
        Self {
            to_add: desired.difference(current).copied().collect(),
            to_remove: current.difference(desired).copied().collect(),
            unchanged: desired.intersection(current).copied().collect(),
        }
    }

    /// Number of writes the plan issues: `|desired Δ current|`.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }

    /// Returns true if applying the plan writes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Writes in application order: every add, then every remove, each
    /// ascending by member.
    #[must_use]
    pub fn operations(&self) -> Vec<SyncOp<M>> {
        self.to_add
            .iter()
            .map(|member| SyncOp::Add(*member))
            .chain(self.to_remove.iter().map(|member| SyncOp::Remove(*member)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(members: &[u32]) -> BTreeSet<u32> {
        members.iter().copied().collect()
    }

    #[test]
    fn test_diff_adds_and_removes() {
        let plan = SyncPlan::diff(&set(&[2, 3, 4]), &set(&[1, 2, 3]));

        assert_eq!(plan.to_add, set(&[4]));
        assert_eq!(plan.to_remove, set(&[1]));
        assert_eq!(plan.unchanged, set(&[2, 3]));
        assert_eq!(plan.write_count(), 2);
        assert_eq!(plan.operations(), vec![SyncOp::Add(4), SyncOp::Remove(1)]);
    }

    #[test]
    fn test_diff_identical_sets_is_noop() {
        let plan = SyncPlan::diff(&set(&[5, 6]), &set(&[5, 6]));

        assert!(plan.is_noop());
        assert_eq!(plan.write_count(), 0);
        assert!(plan.operations().is_empty());
    }

    #[test]
    fn test_diff_empty_desired_removes_everything() {
        let plan = SyncPlan::diff(&set(&[]), &set(&[1, 2]));

        assert!(plan.to_add.is_empty());
        assert_eq!(plan.to_remove, set(&[1, 2]));
        assert!(plan.unchanged.is_empty());
    }

    #[test]
    fn test_diff_empty_current_adds_everything() {
        let plan = SyncPlan::diff(&set(&[9, 7]), &set(&[]));

        assert_eq!(
            plan.operations(),
            vec![SyncOp::Add(7), SyncOp::Add(9)]
        );
    }

    #[test]
    fn test_op_display_and_member() {
        assert_eq!(SyncOp::Add(3).to_string(), "add 3");
        assert_eq!(SyncOp::Remove(4).to_string(), "remove 4");
        assert_eq!(SyncOp::Remove(4).member(), 4);
    }
}
