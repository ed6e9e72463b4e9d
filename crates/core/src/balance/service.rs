//! Balance reconciler keeping `remaining_amount` in line with payments and additions.

use std::future::Future;

use tally_shared::types::ProjectId;
use tracing::{debug, info, warn};

use super::calculator::BalanceCalculator;
use super::error::BalanceError;
use super::types::{AdditionRecord, PaymentRecord, ProjectBudget, Reconciliation};
use crate::store::StoreError;

/// Storage collaborator for balance reconciliation.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait BalanceStore: Send + Sync {
    /// Loads the budget and version of a project, `None` if it does not exist.
    fn project_budget(
        &self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<Option<ProjectBudget>, StoreError>> + Send;

    /// Lists every payment of a project.
    fn list_payments(
        &self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<Vec<PaymentRecord>, StoreError>> + Send;

    /// Lists every addition of a project.
    fn list_additions(
        &self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<Vec<AdditionRecord>, StoreError>> + Send;

    /// Writes the remaining amount if the project is still at `expected_version`,
    /// bumping the version. Returns `false` when the version has moved.
    fn set_remaining_amount(
        &self,
        project_id: ProjectId,
        remaining: rust_decimal::Decimal,
        expected_version: i64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Recomputes and persists project balances.
///
/// Stateless apart from the store it reads through; one call runs its reads
/// and its single write sequentially and never retries.
#[derive(Debug, Clone)]
pub struct BalanceReconciler<S> {
    store: S,
}

impl<S: BalanceStore> BalanceReconciler<S> {
    /// Creates a reconciler over the given store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Recomputes `remaining_amount` for one project and persists it.
    ///
    /// Safe to repeat: with no intervening writes a second call stores the same value.
    ///
    /// # Errors
    ///
    /// - `ProjectNotFound` if the project does not exist
    /// - `NegativeBudget` / `NegativeAddition` / `NegativePayment` / `Overflow` on bad stored data
    /// - `ConcurrentModification` if the project version moved before the write
    /// - `Store` if any read or the write fails
    pub async fn reconcile(&self, project_id: ProjectId) -> Result<Reconciliation, BalanceError> {
        let project = self
            .store
            .project_budget(project_id)
            .await?
            .ok_or(BalanceError::ProjectNotFound(project_id))?;

        let additions = self.store.list_additions(project_id).await?;
        let payments = self.store.list_payments(project_id).await?;

        let breakdown =
            BalanceCalculator::compute(project_id, project.budget, &additions, &payments)?;

        debug!(
            %project_id,
            budget = %breakdown.budget,
            additions = %breakdown.total_additions,
            paid = %breakdown.total_paid,
            remaining = %breakdown.remaining,
            "Computed project balance"
        );

        let written = self
            .store
            .set_remaining_amount(project_id, breakdown.remaining, project.version)
            .await?;

        if !written {
            warn!(%project_id, version = project.version, "Project version moved during reconciliation");
            return Err(BalanceError::ConcurrentModification(project_id));
        }

        info!(%project_id, remaining = %breakdown.remaining, "Project balance reconciled");

        Ok(Reconciliation {
            project_id,
            breakdown,
            version: project.version + 1,
        })
    }

    /// Reconciles each project independently.
    ///
    /// A failure on one project does not stop the others; every project gets
    /// its own outcome, in input order.
    pub async fn reconcile_many<I>(
        &self,
        project_ids: I,
    ) -> Vec<(ProjectId, Result<Reconciliation, BalanceError>)>
    where
        I: IntoIterator<Item = ProjectId>,
    {
        let mut outcomes = Vec::new();
        for project_id in project_ids {
            let outcome = self.reconcile(project_id).await;
            outcomes.push((project_id, outcome));
        }
        outcomes
    }
}
