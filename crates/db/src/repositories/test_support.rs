//! Mock rows shared by the repository tests.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, MockExecResult};
use uuid::Uuid;

use crate::entities::{additions, payments, projects};

pub fn project(id: Uuid, budget: Decimal) -> projects::Model {
    let now = Utc::now().into();
    projects::Model {
        id,
        name: "Roof".to_string(),
        budget: Some(budget),
        remaining_amount: budget,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn payment(project_id: Uuid, amount: Decimal) -> payments::Model {
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

pub fn addition(project_id: Uuid, cost: Decimal) -> additions::Model {
    let now = Utc::now().into();
    additions::Model {
        id: Uuid::new_v4(),
        project_id,
        description: Some("Extra outlet".to_string()),
        cost: Some(cost),
        created_at: now,
        updated_at: now,
    }
}

pub fn exec_ok() -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: 1,
    }
}

/// Asserts the logged statements contain `fragments` in this order.
///
/// Fragments are matched against the debug form of the log, where quoted
/// identifiers appear as `\"table\"`.
pub fn assert_statement_order(db: DatabaseConnection, fragments: &[&str]) {
    let log = format!("{:?}", db.into_transaction_log());
    let mut from = 0;
    for fragment in fragments {
        let Some(at) = log[from..].find(fragment) else {
            panic!("`{fragment}` not found after offset {from} in {log}");
        };
        from += at + fragment.len();
    }
}
