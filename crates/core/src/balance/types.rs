//! Balance data types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AdditionId, PaymentId, ProjectId};

/// The authoritative inputs of a project's balance as read from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBudget {
    /// Project budget. `None` counts as zero.
    pub budget: Option<Decimal>,
    /// Optimistic concurrency version of the project row.
    pub version: i64,
}

/// A payment made against a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Payment ID.
    pub id: PaymentId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Amount paid. `None` counts as zero.
    pub amount_paid: Option<Decimal>,
    /// Date of the payment.
    pub payment_date: Option<NaiveDate>,
}

/// An extra cost added on top of a project's budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionRecord {
    /// Addition ID.
    pub id: AdditionId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Cost of the addition. `None` counts as zero.
    pub cost: Option<Decimal>,
}

/// Computed balance of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceBreakdown {
    /// Budget (zero when absent).
    pub budget: Decimal,
    /// Sum of all addition costs.
    pub total_additions: Decimal,
    /// Sum of all payments.
    pub total_paid: Decimal,
    /// `budget + total_additions - total_paid`. Negative on overpayment.
    pub remaining: Decimal,
}

impl BalanceBreakdown {
    /// Remaining amount floored at zero, for presentation only.
    ///
    /// The persisted value is always the signed [`BalanceBreakdown::remaining`].
    #[must_use]
    pub fn display_remaining(&self) -> Decimal {
        self.remaining.max(Decimal::ZERO)
    }

    /// Returns true if payments exceed budget plus additions.
    #[must_use]
    pub fn is_overpaid(&self) -> bool {
        self.remaining.is_sign_negative() && !self.remaining.is_zero()
    }
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Reconciled project.
    pub project_id: ProjectId,
    /// The balance that was persisted.
    pub breakdown: BalanceBreakdown,
    /// Project version after the write.
    pub version: i64,
}
