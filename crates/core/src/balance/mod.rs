//! Project balance reconciliation.
//!
//! A project's `remaining_amount` is a materialized aggregate:
//! `budget + Σ additions.cost - Σ payments.amount_paid`, stored signed.
//! It is refreshed explicitly by whichever operation changes one of its
//! inputs; nothing here subscribes to events.

pub mod calculator;
pub mod error;
pub mod service;
pub mod types;


pub use calculator::BalanceCalculator;
pub use error::BalanceError;
pub use service::{BalanceReconciler, BalanceStore};
pub use types::{AdditionRecord, BalanceBreakdown, PaymentRecord, ProjectBudget, Reconciliation};
