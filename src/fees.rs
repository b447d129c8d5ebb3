use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LoanTerms;
use crate::dates;
use crate::decimal::Money;

/// fees owed as of a reference date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAssessment {
    pub late_fee: Money,
    pub early_fee: Money,
    pub in_grace_period: bool,
    pub is_early_repayment_window: bool,
    pub days_since_start: i64,
}

impl FeeAssessment {
    pub fn total(&self) -> Money {
        self.late_fee + self.early_fee
    }
}

/// evaluates late-payment and early-repayment fees for a loan's terms
pub struct FeePolicy<'a> {
    terms: &'a LoanTerms,
}

impl<'a> FeePolicy<'a> {
    pub fn new(terms: &'a LoanTerms) -> Self {
        Self { terms }
    }

    /// assess fees on `balance` as of `reference`
    pub fn evaluate(&self, start_date: NaiveDate, reference: NaiveDate, balance: Money) -> FeeAssessment {
        let days_since_start = dates::days_since(start_date, reference);

        let in_grace_period = days_since_start <= i64::from(self.terms.grace_period_days);
        let is_early_repayment_window =
            days_since_start < i64::from(self.terms.early_repayment_period_days);
        let past_term = days_since_start > i64::from(self.terms.duration_days);

        let late_fee = if !in_grace_period && past_term {
            self.terms.late_fee.amount(balance)
        } else {
            Money::ZERO
        };

        let early_fee = if self.terms.allows_early_repayment && is_early_repayment_window {
            self.terms.early_repayment_fee.amount(balance)
        } else {
            Money::ZERO
        };

        debug!(
            days_since_start,
            in_grace_period,
            is_early_repayment_window,
            late_fee = %late_fee,
            early_fee = %early_fee,
            "fees evaluated"
        );

        FeeAssessment {
            late_fee,
            early_fee,
            in_grace_period,
            is_early_repayment_window,
            days_since_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::FeeRule;
    use rust_decimal_macros::dec;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn terms() -> LoanTerms {
        LoanTerms::new(Money::from_major(1_200), Rate::from_percentage(12), 30)
            .with_grace_period(5)
            .with_late_fee(FeeRule::Fixed(Money::from_major(25)))
    }

    #[test]
    fn test_grace_period_boundary() {
        let terms = terms();
        let policy = FeePolicy::new(&terms);
        let balance = Money::from_major(1_200);

        let at_boundary = policy.evaluate(start(), dates::add_days(start(), 5), balance);
        assert!(at_boundary.in_grace_period);

        let after = policy.evaluate(start(), dates::add_days(start(), 6), balance);
        assert!(!after.in_grace_period);
    }

    #[test]
    fn test_early_window_is_strict() {
        let terms = terms().with_early_repayment(FeeRule::Fixed(Money::from_major(10)), 15);
        let policy = FeePolicy::new(&terms);
        let balance = Money::from_major(1_200);

        let inside = policy.evaluate(start(), dates::add_days(start(), 14), balance);
        assert!(inside.is_early_repayment_window);
        assert_eq!(inside.early_fee, Money::from_major(10));

        let at_boundary = policy.evaluate(start(), dates::add_days(start(), 15), balance);
        assert!(!at_boundary.is_early_repayment_window);
        assert_eq!(at_boundary.early_fee, Money::ZERO);
    }

    #[test]
    fn test_early_fee_requires_allowed_flag() {
        let mut terms = terms().with_early_repayment(FeeRule::Fixed(Money::from_major(10)), 15);
        terms.allows_early_repayment = false;
        let policy = FeePolicy::new(&terms);

        let result = policy.evaluate(start(), dates::add_days(start(), 3), Money::from_major(1_200));
        assert!(result.is_early_repayment_window);
        assert_eq!(result.early_fee, Money::ZERO);
    }

    #[test]
    fn test_late_fee_only_past_term_and_grace() {
        let terms = terms();
        let policy = FeePolicy::new(&terms);
        let balance = Money::from_major(1_200);

        // out of grace but within the term
        let within_term = policy.evaluate(start(), dates::add_days(start(), 20), balance);
        assert_eq!(within_term.late_fee, Money::ZERO);

        // at the term boundary the loan is not yet late
        let at_term = policy.evaluate(start(), dates::add_days(start(), 30), balance);
        assert_eq!(at_term.late_fee, Money::ZERO);

        let late = policy.evaluate(start(), dates::add_days(start(), 35), balance);
        assert_eq!(late.late_fee, Money::from_major(25));
        assert_eq!(late.days_since_start, 35);
    }

    #[test]
    fn test_percentage_late_fee_uses_balance() {
        let terms = terms().with_late_fee(FeeRule::Percentage(dec!(2.5)));
        let policy = FeePolicy::new(&terms);

        let late = policy.evaluate(start(), dates::add_days(start(), 40), Money::from_major(1_000));
        assert_eq!(late.late_fee, Money::from_major(25));
        assert_eq!(late.total(), Money::from_major(25));
    }

    #[test]
    fn test_grace_longer_than_term_suppresses_late_fee() {
        let terms = terms().with_grace_period(60);
        let policy = FeePolicy::new(&terms);

        let result = policy.evaluate(start(), dates::add_days(start(), 45), Money::from_major(1_000));
        assert!(result.in_grace_period);
        assert_eq!(result.late_fee, Money::ZERO);
    }
}
