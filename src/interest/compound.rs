use rust_decimal::Decimal;

use crate::decimal::{guard, Money, Rate};
use crate::interest::{InterestCalculation, InterestCalculator};
use crate::types::{InterestPeriod, InterestType};

/// interest compounded once per calculation period
pub struct CompoundAccrual {
    pub period: InterestPeriod,
}

impl CompoundAccrual {
    pub fn new(period: InterestPeriod) -> Self {
        Self { period }
    }

    /// growth factor over `days`: whole periods compound, the trailing
    /// partial period accrues simply on the compounded amount
    fn growth_factor(&self, annual_rate: Rate, days: i64) -> Option<Decimal> {
        let day_count = i64::from(self.period.day_count());
        let whole_periods = days / day_count;
        let stub = Decimal::from(days % day_count).checked_div(Decimal::from(day_count))?;

        let period_rate = annual_rate
            .as_decimal()
            .checked_div(Decimal::from(self.period.periods_per_year()))?;
        let base = Decimal::ONE.checked_add(period_rate)?;

        // calculate (1 + r)^n using iteration
        let mut factor = Decimal::ONE;
        for _ in 0..whole_periods {
            factor = factor.checked_mul(base)?;
        }

        let stub_factor = Decimal::ONE.checked_add(period_rate.checked_mul(stub)?)?;
        factor.checked_mul(stub_factor)
    }
}

impl InterestCalculator for CompoundAccrual {
    fn calculate_interest(&self, base: Money, annual_rate: Rate, days: i64) -> InterestCalculation {
        if days <= 0 || !base.is_positive() {
            return InterestCalculation::nothing_due(base, days.max(0), InterestType::Compound, self.period);
        }

        let interest = self
            .growth_factor(annual_rate, days)
            .and_then(|factor| factor.checked_sub(Decimal::ONE))
            .and_then(|growth| base.as_decimal().checked_mul(growth));

        let periods = Decimal::from(days)
            .checked_div(Decimal::from(self.period.day_count()))
            .unwrap_or(Decimal::ZERO);

        InterestCalculation {
            interest_amount: guard(interest, "compound interest"),
            principal_base: base,
            days,
            periods,
            interest_type: InterestType::Compound,
            period: self.period,
        }
    }
}
