//! Payment repository for database operations.
//!
//! Each write locks the owning project, applies the change and reconciles
//! the project's balance in the same transaction.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait, QuerySelect,
    Set, TransactionTrait,
};
use tally_core::balance::{BalanceCalculator, BalanceError, BalanceReconciler, Reconciliation};
use tally_shared::types::{PaymentId, ProjectId};
use tracing::info;

use super::project::{ProjectError, lock_project};
use crate::entities::payments;
use crate::stores::SeaBalanceStore;

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct CreatePaymentInput {
    /// Project the payment is made against.
    pub project_id: ProjectId,
    /// Amount paid. Must be positive.
    pub amount_paid: Decimal,
    /// Date of the payment.
    pub payment_date: Option<NaiveDate>,
}

/// A payment write together with the balance it produced.
#[derive(Debug, Clone)]
pub struct PaymentChange {
    /// Payment row after the write. For deletes, the row that was removed.
    pub payment: payments::Model,
    /// Balance persisted for the owning project.
    pub reconciliation: Reconciliation,
}

/// Payment repository.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a payment and reconciles the project.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive, the project does not
    /// exist, or the database operation fails.
    pub async fn create_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<PaymentChange, ProjectError> {
        BalanceCalculator::validate_payment_amount(input.amount_paid)?;

        let txn = self.db.begin().await?;
        lock_project(&txn, input.project_id).await?;

        let now = Utc::now().into();
        let payment = payments::ActiveModel {
            id: Set(PaymentId::new().into_inner()),
            project_id: Set(input.project_id.into_inner()),
            amount_paid: Set(Some(input.amount_paid)),
            payment_date: Set(input.payment_date),
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
            payment_id = %payment.id,
            project_id = %input.project_id,
            amount = %input.amount_paid,
            "Payment recorded"
        );

        Ok(PaymentChange {
            payment,
            reconciliation,
        })
    }

    /// Changes the amount of a payment and reconciles its project.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive, the payment does not
    /// exist, or the database operation fails.
    pub async fn update_payment_amount(
        &self,
        id: PaymentId,
        amount_paid: Decimal,
    ) -> Result<PaymentChange, ProjectError> {
        BalanceCalculator::validate_payment_amount(amount_paid)?;

        let txn = self.db.begin().await?;
        let existing = find_payment(&txn, id).await?;
        let project_id = ProjectId::from_uuid(existing.project_id);
        lock_project(&txn, project_id).await?;

        let mut active: payments::ActiveModel = existing.into();
        active.amount_paid = Set(Some(amount_paid));
        active.updated_at = Set(Utc::now().into());
        let payment = active.update(&txn).await?;

        let reconciliation = BalanceReconciler::new(SeaBalanceStore::new(&txn))
            .reconcile(project_id)
            .await?;

        txn.commit().await?;

        Ok(PaymentChange {
            payment,
            reconciliation,
        })
    }

    /// Deletes a payment and reconciles its project.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment does not exist or the database
    /// operation fails.
    pub async fn delete_payment(&self, id: PaymentId) -> Result<PaymentChange, ProjectError> {
        let txn = self.db.begin().await?;
        let existing = find_payment(&txn, id).await?;
        let project_id = ProjectId::from_uuid(existing.project_id);
        lock_project(&txn, project_id).await?;

        existing.clone().delete(&txn).await?;

        let reconciliation = BalanceReconciler::new(SeaBalanceStore::new(&txn))
            .reconcile(project_id)
            .await?;

        txn.commit().await?;

        info!(payment_id = %id, %project_id, "Payment deleted");

        Ok(PaymentChange {
            payment: existing,
            reconciliation,
        })
    }
}

async fn find_payment<C: ConnectionTrait>(
    conn: &C,
    id: PaymentId,
) -> Result<payments::Model, ProjectError> {
    payments::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| BalanceError::PaymentNotFound(id).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{additions, projects};
    use crate::repositories::test_support::{
        addition, assert_statement_order, exec_ok, payment, project,
    };
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_create_payment_reconciles_in_same_transaction() {
        let id = Uuid::new_v4();
        let inserted = payment(id, dec!(400));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // lock
            .append_query_results([vec![project(id, dec!(1000))]])
            // insert .. returning
            .append_query_results([vec![inserted.clone()]])
            // reconcile reads
            .append_query_results([vec![project(id, dec!(1000))]])
            .append_query_results([Vec::<additions::Model>::new()])
            .append_query_results([vec![payment(id, dec!(700)), inserted]])
            .append_exec_results([exec_ok()])
            .into_connection();
        let repo = PaymentRepository::new(db);

        let change = repo
            .create_payment(CreatePaymentInput {
                project_id: ProjectId::from_uuid(id),
                amount_paid: dec!(400),
                payment_date: None,
            })
            .await
            .unwrap();

        // Overpaid: stored signed, displayed as zero.
        assert_eq!(change.reconciliation.breakdown.remaining, dec!(-100));
        assert_eq!(change.reconciliation.breakdown.display_remaining(), dec!(0));
        assert_eq!(change.reconciliation.version, 1);
    }

    #[tokio::test]
    async fn test_update_payment_amount_reconciles_in_same_transaction() {
        let id = Uuid::new_v4();
        let existing = payment(id, dec!(700));
        let updated = payments::Model {
            amount_paid: Some(dec!(400)),
            ..existing.clone()
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .append_query_results([vec![project(id, dec!(1000))]])
            .append_query_results([vec![updated.clone()]])
            .append_query_results([vec![project(id, dec!(1000))]])
            .append_query_results([vec![addition(id, dec!(50))]])
            .append_query_results([vec![updated, payment(id, dec!(200))]])
            .append_exec_results([exec_ok()])
            .into_connection();
        let repo = PaymentRepository::new(db.clone());

        let change = repo
            .update_payment_amount(PaymentId::from_uuid(existing.id), dec!(400))
            .await
            .unwrap();

        assert_eq!(change.payment.amount_paid, Some(dec!(400)));
        assert_eq!(change.reconciliation.breakdown.total_paid, dec!(600));
        assert_eq!(change.reconciliation.breakdown.remaining, dec!(450));
        assert_eq!(change.reconciliation.version, 1);

        assert_statement_order(
            db,
            &[
                r#"FROM \"payments\""#,
                "FOR UPDATE",
                r#"FROM \"projects\""#,
                "FOR UPDATE",
                r#"UPDATE \"payments\" SET"#,
                r#"FROM \"projects\""#,
                r#"FROM \"additions\""#,
                r#"FROM \"payments\""#,
                r#"UPDATE \"projects\" SET"#,
            ],
        );
    }

    #[tokio::test]
    async fn test_delete_payment_reconciles_in_same_transaction() {
        let id = Uuid::new_v4();
        let existing = payment(id, dec!(700));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .append_query_results([vec![project(id, dec!(1000))]])
            .append_query_results([vec![project(id, dec!(1000))]])
            .append_query_results([Vec::<additions::Model>::new()])
            .append_query_results([vec![payment(id, dec!(200))]])
            // delete, balance write
            .append_exec_results([exec_ok(), exec_ok()])
            .into_connection();
        let repo = PaymentRepository::new(db.clone());

        let change = repo
            .delete_payment(PaymentId::from_uuid(existing.id))
            .await
            .unwrap();

        assert_eq!(change.payment, existing);
        assert_eq!(change.reconciliation.breakdown.remaining, dec!(800));
        assert_eq!(change.reconciliation.version, 1);

        assert_statement_order(
            db,
            &[
                r#"FROM \"payments\""#,
                "FOR UPDATE",
                r#"FROM \"projects\""#,
                "FOR UPDATE",
                r#"DELETE FROM \"payments\""#,
                r#"FROM \"projects\""#,
                r#"FROM \"additions\""#,
                r#"FROM \"payments\""#,
                r#"UPDATE \"projects\" SET"#,
            ],
        );
    }

    #[rstest]
    #[case(dec!(0), "ZERO_AMOUNT")]
    #[case(dec!(-5), "NEGATIVE_AMOUNT")]
    #[case(dec!(0.00001), "AMOUNT_TOO_PRECISE")]
    #[case(dec!(1000000000000000), "AMOUNT_OUT_OF_RANGE")]
    #[tokio::test]
    async fn test_create_rejects_unstorable_amount(
        #[case] amount: Decimal,
        #[case] code: &str,
    ) {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let repo = PaymentRepository::new(db);

        let err = repo
            .create_payment(CreatePaymentInput {
                project_id: ProjectId::new(),
                amount_paid: amount,
                payment_date: None,
            })
            .await
            .unwrap_err();

        match err {
            ProjectError::Balance(e) => assert_eq!(e.error_code(), code),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_create_for_missing_project_inserts_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<projects::Model>::new()])
            .into_connection();
        let repo = PaymentRepository::new(db);
        let project_id = ProjectId::new();

        let err = repo
            .create_payment(CreatePaymentInput {
                project_id,
                amount_paid: dec!(10),
                payment_date: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProjectError::Balance(BalanceError::ProjectNotFound(id)) if id == project_id
        ));
    }

    #[tokio::test]
    async fn test_update_missing_payment_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<payments::Model>::new()])
            .into_connection();
        let repo = PaymentRepository::new(db);

        let err = repo
            .update_payment_amount(PaymentId::new(), dec!(25))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProjectError::Balance(BalanceError::PaymentNotFound(_))
        ));
    }
}
