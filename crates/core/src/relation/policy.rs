//! Declarative membership rules checked by callers before synchronizing.

use std::collections::BTreeSet;

use super::error::MembershipError;

/// Minimum-size rule for one join relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipRule {
    relation: &'static str,
    min_members: usize,
}

impl MembershipRule {
    /// The owner must always keep at least one member.
    #[must_use]
    pub const fn at_least_one(relation: &'static str) -> Self {
        Self {
            relation,
            min_members: 1,
        }
    }

    /// Any desired set is allowed, including the empty one.
    #[must_use]
    pub const fn unrestricted(relation: &'static str) -> Self {
        Self {
            relation,
            min_members: 0,
        }
    }

    /// Relation this rule guards.
    #[must_use]
    pub const fn relation(&self) -> &'static str {
        self.relation
    }

    /// Minimum number of members.
    #[must_use]
    pub const fn min_members(&self) -> usize {
        self.min_members
    }

    /// Checks a desired membership set against the rule.
    ///
    /// # Errors
    ///
    /// Returns `MembershipError::TooFewMembers` when the set is too small.
    pub fn check<M>(&self, desired: &BTreeSet<M>) -> Result<(), MembershipError> {
        if desired.len() < self.min_members {
            return Err(MembershipError::TooFewMembers {
                relation: self.relation,
                required: self.min_members,
                actual: desired.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_least_one_rejects_empty() {
        let rule = MembershipRule::at_least_one("role_permissions");
        let err = rule.check::<u32>(&BTreeSet::new()).unwrap_err();

        assert_eq!(
            err,
            MembershipError::TooFewMembers {
                relation: "role_permissions",
                required: 1,
                actual: 0,
            }
        );
    }

    #[test]
    fn test_at_least_one_accepts_single_member() {
        let rule = MembershipRule::at_least_one("role_permissions");
        assert!(rule.check(&BTreeSet::from([1u32])).is_ok());
    }

    #[test]
    fn test_unrestricted_accepts_empty() {
        let rule = MembershipRule::unrestricted("project_categories");
        assert!(rule.check::<u32>(&BTreeSet::new()).is_ok());
        assert_eq!(rule.min_members(), 0);
        assert_eq!(rule.relation(), "project_categories");
    }
}
