//! Pure balance arithmetic and amount validation.

use rust_decimal::Decimal;
use tally_shared::types::ProjectId;

use super::error::BalanceError;
use super::types::{AdditionRecord, BalanceBreakdown, PaymentRecord};

/// Decimal places kept by the `NUMERIC(19,4)` amount columns.
pub const AMOUNT_SCALE: u32 = 4;

/// Smallest magnitude that no longer fits `NUMERIC(19,4)`: 10^15.
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Stateless calculator for project balances.
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Computes `budget + Σ additions - Σ payments` for one project.
    ///
    /// Missing numbers count as zero. The result is not clamped.
    ///
    /// # Errors
    ///
    /// Returns `NegativeBudget`, `NegativeAddition` or `NegativePayment` when a
    /// stored value is below zero, and `Overflow` if a sum leaves the decimal range.
    pub fn compute(
        project_id: ProjectId,
        budget: Option<Decimal>,
        additions: &[AdditionRecord],
        payments: &[PaymentRecord],
    ) -> Result<BalanceBreakdown, BalanceError> {
        let budget = budget.unwrap_or(Decimal::ZERO);
        if budget < Decimal::ZERO {
            return Err(BalanceError::NegativeBudget(project_id));
        }

        let mut total_additions = Decimal::ZERO;
        for addition in additions {
            let cost = addition.cost.unwrap_or(Decimal::ZERO);
            if cost < Decimal::ZERO {
                return Err(BalanceError::NegativeAddition(addition.id));
            }
            total_additions = total_additions
                .checked_add(cost)
                .ok_or(BalanceError::Overflow(project_id))?;
        }

        let mut total_paid = Decimal::ZERO;
        for payment in payments {
            let amount = payment.amount_paid.unwrap_or(Decimal::ZERO);
            if amount < Decimal::ZERO {
                return Err(BalanceError::NegativePayment(payment.id));
            }
            total_paid = total_paid
                .checked_add(amount)
                .ok_or(BalanceError::Overflow(project_id))?;
        }

        let remaining = budget
            .checked_add(total_additions)
            .and_then(|gross| gross.checked_sub(total_paid))
            .ok_or(BalanceError::Overflow(project_id))?;

        Ok(BalanceBreakdown {
            budget,
            total_additions,
            total_paid,
            remaining,
        })
    }

    /// Validates the amount of a payment being created or edited.
    ///
    /// # Errors
    ///
    /// Returns `TooPrecise`, `OutOfRange`, `ZeroAmount` or `NegativeAmount`.
    pub fn validate_payment_amount(amount: Decimal) -> Result<(), BalanceError> {
        Self::check_storable(amount)?;
        if amount.is_zero() {
            return Err(BalanceError::ZeroAmount);
        }
        if amount.is_sign_negative() {
            return Err(BalanceError::NegativeAmount);
        }
        Ok(())
    }

    /// Validates the cost of an addition being created or edited. Zero is allowed.
    ///
    /// # Errors
    ///
    /// Returns `TooPrecise`, `OutOfRange` or `NegativeAmount`.
    pub fn validate_addition_cost(cost: Decimal) -> Result<(), BalanceError> {
        Self::check_storable(cost)?;
        if cost < Decimal::ZERO {
            return Err(BalanceError::NegativeAmount);
        }
        Ok(())
    }

    /// Validates a budget being set on a project. `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns `TooPrecise`, `OutOfRange` or `NegativeAmount`.
    pub fn validate_budget(budget: Option<Decimal>) -> Result<(), BalanceError> {
        match budget {
            Some(value) => {
                Self::check_storable(value)?;
                if value < Decimal::ZERO {
                    return Err(BalanceError::NegativeAmount);
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Rejects values the amount columns would round or refuse.
    /// Trailing zeros do not count towards the scale.
    fn check_storable(value: Decimal) -> Result<(), BalanceError> {
        if value.normalize().scale() > AMOUNT_SCALE {
            return Err(BalanceError::TooPrecise(AMOUNT_SCALE));
        }
        if value.abs() >= AMOUNT_LIMIT {
            return Err(BalanceError::OutOfRange);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use tally_shared::types::{AdditionId, PaymentId};

    fn addition(cost: Option<Decimal>) -> AdditionRecord {
        AdditionRecord {
            id: AdditionId::new(),
            project_id: ProjectId::default(),
            cost,
        }
    }

    fn payment(amount: Option<Decimal>) -> PaymentRecord {
        PaymentRecord {
            id: PaymentId::new(),
            project_id: ProjectId::default(),
            amount_paid: amount,
            payment_date: None,
        }
    }

    #[test]
    fn test_compute_budget_with_additions_and_payments() {
        let result = BalanceCalculator::compute(
            ProjectId::new(),
            Some(dec!(100000)),
            &[addition(Some(dec!(8000))), addition(Some(dec!(12000)))],
            &[payment(Some(dec!(50000))), payment(Some(dec!(30000)))],
        )
        .unwrap();

        assert_eq!(result.budget, dec!(100000));
        assert_eq!(result.total_additions, dec!(20000));
        assert_eq!(result.total_paid, dec!(80000));
        assert_eq!(result.remaining, dec!(40000));
    }

    #[test]
    fn test_compute_null_budget_no_records() {
        let result = BalanceCalculator::compute(ProjectId::new(), None, &[], &[]).unwrap();

        assert_eq!(result.remaining, Decimal::ZERO);
        assert!(!result.is_overpaid());
    }

    #[test]
    fn test_compute_treats_null_amounts_as_zero() {
        let result = BalanceCalculator::compute(
            ProjectId::new(),
            Some(dec!(10)),
            &[addition(None), addition(Some(dec!(2.50)))],
            &[payment(None), payment(Some(dec!(1.25)))],
        )
        .unwrap();

        assert_eq!(result.remaining, dec!(11.25));
    }

    #[test]
    fn test_compute_keeps_overpayment_signed() {
        let result = BalanceCalculator::compute(
            ProjectId::new(),
            Some(dec!(100)),
            &[],
            &[payment(Some(dec!(150)))],
        )
        .unwrap();

        assert_eq!(result.remaining, dec!(-50));
        assert!(result.is_overpaid());
        assert_eq!(result.display_remaining(), Decimal::ZERO);
    }

    #[test]
    fn test_compute_is_decimal_exact() {
        let result = BalanceCalculator::compute(
            ProjectId::new(),
            Some(dec!(0.3)),
            &[addition(Some(dec!(0.1))), addition(Some(dec!(0.2)))],
            &[payment(Some(dec!(0.6)))],
        )
        .unwrap();

        assert_eq!(result.remaining, Decimal::ZERO);
    }

    #[test]
    fn test_compute_rejects_negative_records() {
        let project = ProjectId::new();
        let bad_addition = addition(Some(dec!(-1)));
        let bad_payment = payment(Some(dec!(-1)));

        assert!(matches!(
            BalanceCalculator::compute(project, Some(dec!(-5)), &[], &[]),
            Err(BalanceError::NegativeBudget(id)) if id == project
        ));
        assert!(matches!(
            BalanceCalculator::compute(project, None, &[bad_addition.clone()], &[]),
            Err(BalanceError::NegativeAddition(id)) if id == bad_addition.id
        ));
        assert!(matches!(
            BalanceCalculator::compute(project, None, &[], &[bad_payment.clone()]),
            Err(BalanceError::NegativePayment(id)) if id == bad_payment.id
        ));
    }

    #[test]
    fn test_compute_reports_overflow() {
        let project = ProjectId::new();
        let result = BalanceCalculator::compute(
            project,
            Some(Decimal::MAX),
            &[addition(Some(Decimal::MAX))],
            &[],
        );

        assert!(matches!(result, Err(BalanceError::Overflow(id)) if id == project));
    }

    #[rstest]
    #[case(dec!(0.01), true)]
    #[case(dec!(50000), true)]
    #[case(dec!(0), false)]
    #[case(dec!(-10), false)]
    #[case(dec!(0.00001), false)]
    #[case(dec!(1.50000), true)]
    #[case(dec!(999999999999999.9999), true)]
    #[case(dec!(1000000000000000), false)]
    fn test_validate_payment_amount(#[case] amount: Decimal, #[case] ok: bool) {
        assert_eq!(BalanceCalculator::validate_payment_amount(amount).is_ok(), ok);
    }

    #[rstest]
    #[case(dec!(0), true)]
    #[case(dec!(8000), true)]
    #[case(dec!(-0.01), false)]
    #[case(dec!(12.34567), false)]
    #[case(dec!(2000000000000000), false)]
    fn test_validate_addition_cost(#[case] cost: Decimal, #[case] ok: bool) {
        assert_eq!(BalanceCalculator::validate_addition_cost(cost).is_ok(), ok);
    }

    #[test]
    fn test_validate_budget() {
        assert!(BalanceCalculator::validate_budget(None).is_ok());
        assert!(BalanceCalculator::validate_budget(Some(dec!(0))).is_ok());
        assert!(matches!(
            BalanceCalculator::validate_budget(Some(dec!(-1))),
            Err(BalanceError::NegativeAmount)
        ));
        assert!(matches!(
            BalanceCalculator::validate_budget(Some(dec!(100.00005))),
            Err(BalanceError::TooPrecise(4))
        ));
        assert!(matches!(
            BalanceCalculator::validate_budget(Some(dec!(-1000000000000000))),
            Err(BalanceError::OutOfRange)
        ));
    }

    #[test]
    fn test_sub_column_precision_is_not_zero_amount() {
        assert!(matches!(
            BalanceCalculator::validate_payment_amount(dec!(0.00001)),
            Err(BalanceError::TooPrecise(AMOUNT_SCALE))
        ));
    }

    #[test]
    fn test_amount_limit_is_ten_to_the_fifteenth() {
        assert_eq!(AMOUNT_LIMIT, dec!(1000000000000000));
    }
}
