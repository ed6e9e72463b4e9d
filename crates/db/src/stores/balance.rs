//! Balance store backed by the projects, payments and additions tables.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tally_core::balance::{AdditionRecord, BalanceStore, PaymentRecord, ProjectBudget};
use tally_core::store::StoreError;
use tally_shared::types::{AdditionId, PaymentId, ProjectId};

use crate::entities::{additions, payments, projects};

/// [`BalanceStore`] over any `SeaORM` connection or transaction.
#[derive(Debug, Clone, Copy)]
pub struct SeaBalanceStore<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> SeaBalanceStore<'c, C> {
    /// Creates a store reading and writing through `conn`.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }
}

impl<C: ConnectionTrait> BalanceStore for SeaBalanceStore<'_, C> {
    async fn project_budget(
        &self,
        project_id: ProjectId,
    ) -> Result<Option<ProjectBudget>, StoreError> {
        let project = projects::Entity::find_by_id(project_id.into_inner())
            .one(self.conn)
            .await
            .map_err(StoreError::database)?;

        Ok(project.map(|p| ProjectBudget {
            budget: p.budget,
            version: p.version,
        }))
    }

    async fn list_payments(&self, project_id: ProjectId) -> Result<Vec<PaymentRecord>, StoreError> {
        let models = payments::Entity::find()
            .filter(payments::Column::ProjectId.eq(project_id.into_inner()))
            .all(self.conn)
            .await
            .map_err(StoreError::database)?;

        Ok(models
            .into_iter()
            .map(|m| PaymentRecord {
                id: PaymentId::from_uuid(m.id),
                project_id,
                amount_paid: m.amount_paid,
                payment_date: m.payment_date,
            })
            .collect())
    }

    async fn list_additions(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<AdditionRecord>, StoreError> {
        let models = additions::Entity::find()
            .filter(additions::Column::ProjectId.eq(project_id.into_inner()))
            .all(self.conn)
            .await
            .map_err(StoreError::database)?;

        Ok(models
            .into_iter()
            .map(|m| AdditionRecord {
                id: AdditionId::from_uuid(m.id),
                project_id,
                cost: m.cost,
            })
            .collect())
    }

    async fn set_remaining_amount(
        &self,
        project_id: ProjectId,
        remaining: Decimal,
        expected_version: i64,
    ) -> Result<bool, StoreError> {
        let now: chrono::DateTime<chrono::FixedOffset> = Utc::now().into();

        // Compare-and-set on version; zero rows means someone else wrote first.
        let result = projects::Entity::update_many()
            .col_expr(projects::Column::RemainingAmount, Expr::value(remaining))
            .col_expr(
                projects::Column::Version,
                Expr::col(projects::Column::Version).add(1),
            )
            .col_expr(projects::Column::UpdatedAt, Expr::value(now))
            .filter(projects::Column::Id.eq(project_id.into_inner()))
            .filter(projects::Column::Version.eq(expected_version))
            .exec(self.conn)
            .await
            .map_err(StoreError::database)?;

        Ok(result.rows_affected == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::projects;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use tally_core::balance::BalanceReconciler;
    use uuid::Uuid;

    fn project(id: Uuid, budget: Option<Decimal>, version: i64) -> projects::Model {
        let now = Utc::now().into();
        projects::Model {
            id,
            name: "Kitchen remodel".to_string(),
            budget,
            remaining_amount: Decimal::ZERO,
            version,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment(project_id: Uuid, amount: Decimal) -> payments::Model {
        let now = Utc::now().into();
        payments::Model {
            id: Uuid::new_v4(),
            project_id,
            amount_paid: Some(amount),
            payment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn addition(project_id: Uuid, cost: Option<Decimal>) -> additions::Model {
        let now = Utc::now().into();
        additions::Model {
            id: Uuid::new_v4(),
            project_id,
            description: None,
            cost,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_reconcile_through_sea_store() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![project(id, Some(dec!(1000)), 3)]])
            .append_query_results([vec![addition(id, Some(dec!(200)))]])
            .append_query_results([vec![payment(id, dec!(300)), payment(id, dec!(500))]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let reconciler = BalanceReconciler::new(SeaBalanceStore::new(&db));
        let outcome = reconciler
            .reconcile(ProjectId::from_uuid(id))
            .await
            .unwrap();

        assert_eq!(outcome.breakdown.remaining, dec!(400));
        assert_eq!(outcome.version, 4);
        assert_eq!(db.into_transaction_log().len(), 4);
    }

    #[tokio::test]
    async fn test_stale_version_writes_nothing() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let written = SeaBalanceStore::new(&db)
            .set_remaining_amount(ProjectId::from_uuid(id), dec!(10), 7)
            .await
            .unwrap();

        assert!(!written);
    }

    #[tokio::test]
    async fn test_missing_project_is_none() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<projects::Model>::new()])
            .into_connection();

        let budget = SeaBalanceStore::new(&db)
            .project_budget(ProjectId::new())
            .await
            .unwrap();

        assert!(budget.is_none());
    }

    #[tokio::test]
    async fn test_null_cost_is_preserved() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![addition(id, None)]])
            .into_connection();

        let records = SeaBalanceStore::new(&db)
            .list_additions(ProjectId::from_uuid(id))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cost, None);
    }
}
