//! Balance error types.

use tally_shared::AppError;
use tally_shared::types::{AdditionId, PaymentId, ProjectId};
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while reconciling or validating project balances.
#[derive(Debug, Error)]
pub enum BalanceError {
    // ========== Lookup Errors ==========
    /// Project not found.
    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// Addition not found.
    #[error("Addition not found: {0}")]
    AdditionNotFound(AdditionId),

    // ========== Validation Errors ==========
    /// Amount cannot be zero.
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// Amount cannot be negative.
    #[error("Amount cannot be negative")]
    NegativeAmount,

    /// Amount has more decimal places than the column stores.
    #[error("Amount cannot have more than {0} decimal places")]
    TooPrecise(u32),

    /// Amount does not fit the column's integer digits.
    #[error("Amount is out of range")]
    OutOfRange,

    /// A stored payment carries a negative amount.
    #[error("Payment {0} has a negative amount")]
    NegativePayment(PaymentId),

    /// A stored addition carries a negative cost.
    #[error("Addition {0} has a negative cost")]
    NegativeAddition(AdditionId),

    /// A project carries a negative budget.
    #[error("Project {0} has a negative budget")]
    NegativeBudget(ProjectId),

    /// Sum exceeded the decimal range.
    #[error("Balance of project {0} overflowed")]
    Overflow(ProjectId),

    // ========== Concurrency Errors ==========
    /// The project changed between read and write.
    #[error("Project {0} was modified concurrently, please retry")]
    ConcurrentModification(ProjectId),

    // ========== Storage Errors ==========
    /// Storage collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BalanceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::AdditionNotFound(_) => "ADDITION_NOT_FOUND",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::TooPrecise(_) => "AMOUNT_TOO_PRECISE",
            Self::OutOfRange => "AMOUNT_OUT_OF_RANGE",
            Self::NegativePayment(_) => "NEGATIVE_PAYMENT",
            Self::NegativeAddition(_) => "NEGATIVE_ADDITION",
            Self::NegativeBudget(_) => "NEGATIVE_BUDGET",
            Self::Overflow(_) => "BALANCE_OVERFLOW",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - invalid input
            Self::ZeroAmount
            | Self::NegativeAmount
            | Self::TooPrecise(_)
            | Self::OutOfRange
            | Self::NegativePayment(_)
            | Self::NegativeAddition(_)
            | Self::NegativeBudget(_)
            | Self::Overflow(_) => 400,

            // 404 Not Found
            Self::ProjectNotFound(_) | Self::PaymentNotFound(_) | Self::AdditionNotFound(_) => 404,

            // 409 Conflict
            Self::ConcurrentModification(_) => 409,

            // 500 Internal Server Error
            Self::Store(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }
}

impl From<BalanceError> for AppError {
    fn from(err: BalanceError) -> Self {
        let message = err.to_string();
        match err.http_status_code() {
            404 => Self::NotFound(message),
            400 => Self::Validation(message),
            409 => Self::Conflict(message),
            _ => Self::Database(message),
        }
    }
}
