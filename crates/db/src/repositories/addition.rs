//! Addition repository for database operations.
//!
//! Additions are extra costs on top of a project's budget. Like payments,
//! every write reconciles the owning project in the same transaction.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait, QuerySelect,
    Set, TransactionTrait,
};
use tally_core::balance::{BalanceCalculator, BalanceError, BalanceReconciler, Reconciliation};
use tally_shared::types::{AdditionId, ProjectId};
use tracing::info;

use super::project::{ProjectError, lock_project};
use crate::entities::additions;
use crate::stores::SeaBalanceStore;

/// Input for adding a cost to a project.
#[derive(Debug, Clone)]
pub struct CreateAdditionInput {
    /// Project the cost is added to.
    pub project_id: ProjectId,
    /// Free-form description.
    pub description: Option<String>,
    /// Cost. Zero is allowed, negative is not.
    pub cost: Decimal,
}

/// An addition write together with the balance it produced.
#[derive(Debug, Clone)]
pub struct AdditionChange {
    /// Addition row after the write. For deletes, the row that was removed.
    pub addition: additions::Model,
    /// Balance persisted for the owning project.
    pub reconciliation: Reconciliation,
}

/// Addition repository.
#[derive(Debug, Clone)]
pub struct AdditionRepository {
    db: DatabaseConnection,
}

impl AdditionRepository {
    /// Creates a new addition repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Adds a cost to a project and reconciles it.
    ///
    /// # Errors
    ///
    /// Returns an error if the cost is negative, the project does not exist,
    /// or the database operation fails.
    pub async fn create_addition(
        &self,
        input: CreateAdditionInput,
    ) -> Result<AdditionChange, ProjectError> {
        BalanceCalculator::validate_addition_cost(input.cost)?;

        let txn = self.db.begin().await?;
        lock_project(&txn, input.project_id).await?;

        let now = Utc::now().into();
        let addition = additions::ActiveModel {
            id: Set(AdditionId::new().into_inner()),
            project_id: Set(input.project_id.into_inner()),
            description: Set(input.description),
            cost: Set(Some(input.cost)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let reconciliation = BalanceReconciler::new(SeaBalanceStore::new(&txn))
            .reconcile(input.project_id)
            .await?;

        txn.commit().await?;

        info!(
            addition_id = %addition.id,
            project_id = %input.project_id,
            cost = %input.cost,
            "Addition recorded"
        );

        Ok(AdditionChange {
            addition,
            reconciliation,
        })
    }

    /// Changes the cost of an addition and reconciles its project.
    ///
    /// # Errors
    ///
    /// Returns an error if the cost is negative, the addition does not
    /// exist, or the database operation fails.
    pub async fn update_addition_cost(
        &self,
        id: AdditionId,
        cost: Decimal,
    ) -> Result<AdditionChange, ProjectError> {
        BalanceCalculator::validate_addition_cost(cost)?;

        let txn = self.db.begin().await?;
        let existing = find_addition(&txn, id).await?;
        let project_id = ProjectId::from_uuid(existing.project_id);
        lock_project(&txn, project_id).await?;

        let mut active: additions::ActiveModel = existing.into();
        active.cost = Set(Some(cost));
        active.updated_at = Set(Utc::now().into());
        let addition = active.update(&txn).await?;

        let reconciliation = BalanceReconciler::new(SeaBalanceStore::new(&txn))
            .reconcile(project_id)
            .await?;

        txn.commit().await?;

        Ok(AdditionChange {
            addition,
            reconciliation,
        })
    }

    /// Deletes an addition and reconciles its project.
    ///
    /// # Errors
    ///
    /// Returns an error if the addition does not exist or the database
    /// operation fails.
    pub async fn delete_addition(&self, id: AdditionId) -> Result<AdditionChange, ProjectError> {
        let txn = self.db.begin().await?;
        let existing = find_addition(&txn, id).await?;
        let project_id = ProjectId::from_uuid(existing.project_id);
        lock_project(&txn, project_id).await?;

        existing.clone().delete(&txn).await?;

        let reconciliation = BalanceReconciler::new(SeaBalanceStore::new(&txn))
            .reconcile(project_id)
            .await?;

        txn.commit().await?;

        info!(addition_id = %id, %project_id, "Addition deleted");

        Ok(AdditionChange {
            addition: existing,
            reconciliation,
        })
    }
}

async fn find_addition<C: ConnectionTrait>(
    conn: &C,
    id: AdditionId,
) -> Result<additions::Model, ProjectError> {
    additions::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| BalanceError::AdditionNotFound(id).into())
}
