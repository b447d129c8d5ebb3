pub mod accrual;
pub mod compound;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LoanTerms;
use crate::dates;
use crate::decimal::{Money, Rate};
use crate::types::{InterestPeriod, InterestType};

pub use accrual::SimpleAccrual;
pub use compound::CompoundAccrual;

/// interest calculation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestCalculation {
    pub interest_amount: Money,
    pub principal_base: Money,
    pub days: i64,
    /// calculation periods elapsed, fractional for partial periods
    pub periods: Decimal,
    pub interest_type: InterestType,
    pub period: InterestPeriod,
}

impl InterestCalculation {
    fn nothing_due(base: Money, days: i64, interest_type: InterestType, period: InterestPeriod) -> Self {
        Self {
            interest_amount: Money::ZERO,
            principal_base: base,
            days,
            periods: Decimal::ZERO,
            interest_type,
            period,
        }
    }
}

/// trait for interest calculations over a civil-day span
pub trait InterestCalculator {
    fn calculate_interest(&self, base: Money, annual_rate: Rate, days: i64) -> InterestCalculation;
}

/// accrual restarts at the last payment, or the loan start before any payment
pub fn accrual_start(start_date: NaiveDate, last_payment_date: Option<NaiveDate>) -> NaiveDate {
    match last_payment_date {
        Some(paid) if paid > start_date => paid,
        _ => start_date,
    }
}

/// computes the interest currently due on a loan's balance
pub struct InterestAccrual<'a> {
    terms: &'a LoanTerms,
}

impl<'a> InterestAccrual<'a> {
    pub fn new(terms: &'a LoanTerms) -> Self {
        Self { terms }
    }

    /// interest on `balance` from `from` up to `to`; never negative
    pub fn interest_due(&self, balance: Money, from: NaiveDate, to: NaiveDate) -> InterestCalculation {
        let days = dates::days_between(from, to);
        let rate = self.terms.interest_rate;

        let calculation = match self.terms.interest_type {
            InterestType::Simple => {
                SimpleAccrual::new(self.terms.interest_period).calculate_interest(balance, rate, days)
            }
            InterestType::Compound => {
                CompoundAccrual::new(self.terms.interest_period).calculate_interest(balance, rate, days)
            }
        };

        debug!(
            base = %balance,
            days,
            periods = %calculation.periods,
            interest = %calculation.interest_amount,
            "interest accrued"
        );

        calculation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_accrual_start() {
        let start = date(2024, 1, 1);
        assert_eq!(accrual_start(start, None), start);
        assert_eq!(accrual_start(start, Some(date(2024, 1, 20))), date(2024, 1, 20));
        // a payment recorded before the start never moves accrual backwards
        assert_eq!(accrual_start(start, Some(date(2023, 12, 20))), start);
    }

    #[test]
    fn test_dispatch_on_interest_type() {
        let simple = LoanTerms::new(Money::from_major(10_000), Rate::from_percentage(12), 360);
        let compound = simple.clone().with_interest(InterestType::Compound, InterestPeriod::Monthly);

        let from = date(2024, 1, 1);
        let to = dates::add_days(from, 360);

        let simple_due = InterestAccrual::new(&simple).interest_due(Money::from_major(10_000), from, to);
        let compound_due = InterestAccrual::new(&compound).interest_due(Money::from_major(10_000), from, to);

        assert_eq!(simple_due.interest_amount, Money::from_major(1_200));
        assert_eq!(compound_due.interest_amount, Money::from_str_exact("1268.25").unwrap());
        assert_eq!(compound_due.interest_type, InterestType::Compound);
    }

    #[test]
    fn test_reversed_dates_accrue_nothing() {
        let terms = LoanTerms::new(Money::from_major(1_000), Rate::from_percentage(12), 30);
        let due = InterestAccrual::new(&terms).interest_due(
            Money::from_major(1_000),
            date(2024, 2, 1),
            date(2024, 1, 1),
        );
        assert_eq!(due.interest_amount, Money::ZERO);
    }
}
