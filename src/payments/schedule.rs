use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dates;
use crate::decimal::Money;
use crate::interest::{accrual_start, InterestAccrual};
use crate::state::Loan;

/// next payment the borrower owes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleProjection {
    pub due_date: NaiveDate,
    pub due_amount: Money,
}

/// First period boundary strictly after `today`.
///
/// Boundaries fall every `duration_days` from `start_date`. Before the start
/// the start itself is due. A zero-length period cannot advance, so the start
/// is returned.
pub fn next_due_date(start_date: NaiveDate, duration_days: u32, today: NaiveDate) -> NaiveDate {
    if today < start_date {
        return start_date;
    }

    let duration = i64::from(duration_days);
    let elapsed = dates::days_since(start_date, today);

    let Some(periods) = dates::ceil_div(elapsed, duration) else {
        warn!(%start_date, duration_days, "zero-length repayment period, due date pinned to start");
        return start_date;
    };

    let candidate = dates::add_days(start_date, periods * duration);
    if candidate <= today {
        dates::add_days(candidate, duration)
    } else {
        candidate
    }
}

/// Amount due on `due_date` for a loan whose ledger already reflects its
/// latest payment.
///
/// Zero once paid. The final scheduled payment owes the remaining principal
/// plus interest projected from the accrual start to the due date; earlier
/// payments owe the contracted installment.
pub fn next_due_amount(loan: &Loan, due_date: NaiveDate) -> Money {
    if loan.is_fully_paid() || !loan.ledger.principal_remaining.is_positive() {
        return Money::ZERO;
    }

    let is_final = loan.ledger.completed_payments.saturating_add(1) >= loan.terms.total_payments;
    match loan.terms.installment_amount {
        Some(installment) if !is_final => installment,
        _ => final_amount(loan, due_date),
    }
}

fn final_amount(loan: &Loan, due_date: NaiveDate) -> Money {
    let Some(start) = loan.start_date else {
        return loan.ledger.principal_remaining;
    };

    let from = accrual_start(start, loan.ledger.last_payment_date);
    let interest = InterestAccrual::new(&loan.terms).interest_due(loan.ledger.current_balance, from, due_date);

    loan.ledger.principal_remaining + interest.interest_amount
}

/// project the next payment as seen on `today`
pub fn project(loan: &Loan, today: NaiveDate) -> Option<ScheduleProjection> {
    let start = loan.start_date?;
    let due_date = next_due_date(start, loan.terms.duration_days, today);

    Some(ScheduleProjection {
        due_date,
        due_amount: next_due_amount(loan, due_date),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::config::LoanTerms;
    use crate::decimal::Rate;
    use crate::types::{LoanStatus, PaymentAllocation};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn active_loan(terms: LoanTerms) -> Loan {
        let mut loan = Loan::new(Uuid::new_v4(), terms, Utc::now());
        loan.ledger.open(loan.principal());
        loan.status = LoanStatus::Active;
        loan.start_date = Some(date(2024, 1, 1));
        loan
    }

    #[test]
    fn test_next_due_date_rolls_forward() {
        let start = date(2024, 1, 1);

        assert_eq!(next_due_date(start, 30, date(2024, 2, 5)), date(2024, 3, 1));
        assert_eq!(next_due_date(start, 30, date(2024, 1, 15)), date(2024, 1, 31));
    }

    #[test]
    fn test_boundary_day_moves_to_next_period() {
        let start = date(2024, 1, 1);

        // on the boundary itself the next one is due
        assert_eq!(next_due_date(start, 30, date(2024, 1, 31)), date(2024, 3, 1));
        assert_eq!(next_due_date(start, 30, start), date(2024, 1, 31));
    }

    #[test]
    fn test_before_start_and_zero_duration() {
        let start = date(2024, 1, 1);

        assert_eq!(next_due_date(start, 30, date(2023, 12, 1)), start);
        assert_eq!(next_due_date(start, 0, date(2024, 6, 1)), start);
    }

    #[test]
    fn test_final_payment_includes_projected_interest() {
        let loan = active_loan(LoanTerms::new(Money::from_major(1_200), Rate::from_percentage(12), 30));

        let projection = project(&loan, date(2024, 1, 10)).unwrap();
        assert_eq!(projection.due_date, date(2024, 1, 31));
        assert_eq!(projection.due_amount, Money::from_major(1_212));
    }

    #[test]
    fn test_interest_projected_from_last_payment() {
        let mut loan = active_loan(LoanTerms::new(Money::from_major(1_200), Rate::from_percentage(12), 30));
        let allocation = PaymentAllocation {
            to_interest: Money::from_major(12),
            to_principal: Money::from_major(91),
            ..Default::default()
        };
        loan.ledger = loan.ledger.apply_allocation(
            loan.principal(),
            &allocation,
            Money::from_major(103),
            date(2024, 1, 31),
        );

        // 1109 outstanding, thirty days of interest to 2024-03-01
        let projection = project(&loan, date(2024, 1, 31)).unwrap();
        assert_eq!(projection.due_date, date(2024, 3, 1));
        assert_eq!(projection.due_amount, Money::from_str_exact("1120.09").unwrap());
    }

    #[test]
    fn test_installment_before_final_payment() {
        let terms = LoanTerms::new(Money::from_major(1_200), Rate::from_percentage(12), 30)
            .with_installments(3, Money::from_major(420));
        let loan = active_loan(terms);

        assert_eq!(next_due_amount(&loan, date(2024, 1, 31)), Money::from_major(420));
    }

    #[test]
    fn test_paid_loan_owes_nothing() {
        let mut loan = active_loan(LoanTerms::new(Money::from_major(1_200), Rate::from_percentage(12), 30));
        loan.status = LoanStatus::Paid;

        assert_eq!(next_due_amount(&loan, date(2024, 1, 31)), Money::ZERO);
    }

    #[test]
    fn test_undisbursed_loan_has_no_projection() {
        let loan = Loan::new(
            Uuid::new_v4(),
            LoanTerms::new(Money::from_major(1_000), Rate::from_percentage(10), 30),
            Utc::now(),
        );
        assert!(project(&loan, date(2024, 1, 1)).is_none());
    }
}
