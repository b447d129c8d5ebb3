use rust_decimal::Decimal;

use crate::decimal::{guard, Money, Rate};
use crate::interest::{InterestCalculation, InterestCalculator};
use crate::types::{InterestPeriod, InterestType};

/// simple interest accrued per calculation period
///
/// The annual rate is split evenly over `periods_per_year` and the elapsed
/// days are measured in periods of `day_count` days, partial periods included.
/// A 30-day month at 12% is therefore exactly 1% of the base.
pub struct SimpleAccrual {
    pub period: InterestPeriod,
}

impl SimpleAccrual {
    pub fn new(period: InterestPeriod) -> Self {
        Self { period }
    }

    /// periods elapsed in `days`, fractional
    pub fn elapsed_periods(&self, days: i64) -> Option<Decimal> {
        Decimal::from(days).checked_div(Decimal::from(self.period.day_count()))
    }

    /// rate applied per full period
    pub fn period_rate(&self, annual_rate: Rate) -> Option<Decimal> {
        annual_rate
            .as_decimal()
            .checked_div(Decimal::from(self.period.periods_per_year()))
    }
}

impl InterestCalculator for SimpleAccrual {
    fn calculate_interest(&self, base: Money, annual_rate: Rate, days: i64) -> InterestCalculation {
        if days <= 0 || !base.is_positive() {
            return InterestCalculation::nothing_due(base, days.max(0), InterestType::Simple, self.period);
        }

        let periods = self.elapsed_periods(days);
        let interest = periods.and_then(|periods| {
            self.period_rate(annual_rate)
                .and_then(|rate| base.as_decimal().checked_mul(rate))
                .and_then(|per_period| per_period.checked_mul(periods))
        });

        InterestCalculation {
            interest_amount: guard(interest, "simple interest"),
            principal_base: base,
            days,
            periods: periods.unwrap_or(Decimal::ZERO),
            interest_type: InterestType::Simple,
            period: self.period,
        }
    }
}
