use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{Result, ServicingError};
use crate::types::{FeeRule, InterestPeriod, InterestType};

/// contractual terms the engine reads from a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub currency: String,
    /// annual rate
    pub interest_rate: Rate,
    pub interest_type: InterestType,
    pub interest_period: InterestPeriod,
    pub payment_frequency: InterestPeriod,
    /// length of the repayment period; the whole term in the single-period model
    pub duration_days: u32,
    pub grace_period_days: u32,
    pub late_fee: FeeRule,
    pub early_repayment_fee: FeeRule,
    pub early_repayment_period_days: u32,
    pub allows_early_repayment: bool,
    /// interest contractually due over the life of the loan
    pub contracted_interest: Money,
    /// fixed loan fees (origination and similar) contractually due
    pub contracted_fees: Money,
    #[serde(default = "default_total_payments")]
    pub total_payments: u32,
    /// flat installment for non-final payments
    #[serde(default)]
    pub installment_amount: Option<Money>,
}

fn default_total_payments() -> u32 {
    1
}

impl LoanTerms {
    /// plain single-period loan with simple monthly interest and no fees
    pub fn new(principal: Money, interest_rate: Rate, duration_days: u32) -> Self {
        Self {
            principal,
            currency: "USD".to_string(),
            interest_rate,
            interest_type: InterestType::Simple,
            interest_period: InterestPeriod::Monthly,
            payment_frequency: InterestPeriod::Monthly,
            duration_days,
            grace_period_days: 0,
            late_fee: FeeRule::None,
            early_repayment_fee: FeeRule::None,
            early_repayment_period_days: 0,
            allows_early_repayment: false,
            contracted_interest: Money::ZERO,
            contracted_fees: Money::ZERO,
            total_payments: 1,
            installment_amount: None,
        }
    }

    /// personal loan package: 5 day grace, $25 late fee, 1% early repayment
    /// fee in the first 15 days, 2% origination fee
    pub fn personal_loan(principal: Money, interest_rate: Rate, duration_days: u32) -> Self {
        let contracted_interest = principal
            * (interest_rate.as_decimal() * Decimal::from(duration_days) / dec!(365));

        Self {
            grace_period_days: 5,
            late_fee: FeeRule::Fixed(Money::from_major(25)),
            early_repayment_fee: FeeRule::Percentage(dec!(1)),
            early_repayment_period_days: 15,
            allows_early_repayment: true,
            contracted_interest,
            contracted_fees: principal.percentage(dec!(2)),
            ..Self::new(principal, interest_rate, duration_days)
        }
    }

    /// short-term bridge package: daily compound interest, percentage late fee,
    /// no early repayment
    pub fn bridge_loan(principal: Money, interest_rate: Rate, duration_days: u32) -> Self {
        Self {
            interest_type: InterestType::Compound,
            interest_period: InterestPeriod::Daily,
            payment_frequency: InterestPeriod::Daily,
            grace_period_days: 3,
            late_fee: FeeRule::Percentage(dec!(5)),
            ..Self::new(principal, interest_rate, duration_days)
        }
    }

    pub fn with_interest(mut self, interest_type: InterestType, period: InterestPeriod) -> Self {
        self.interest_type = interest_type;
        self.interest_period = period;
        self
    }

    pub fn with_grace_period(mut self, days: u32) -> Self {
        self.grace_period_days = days;
        self
    }

    pub fn with_late_fee(mut self, rule: FeeRule) -> Self {
        self.late_fee = rule;
        self
    }

    pub fn with_early_repayment(mut self, rule: FeeRule, window_days: u32) -> Self {
        self.early_repayment_fee = rule;
        self.early_repayment_period_days = window_days;
        self.allows_early_repayment = true;
        self
    }

    pub fn with_contracted(mut self, interest: Money, fees: Money) -> Self {
        self.contracted_interest = interest;
        self.contracted_fees = fees;
        self
    }

    pub fn with_installments(mut self, total_payments: u32, installment_amount: Money) -> Self {
        self.total_payments = total_payments;
        self.installment_amount = Some(installment_amount);
        self
    }

    /// reject terms no servicing calculation can be meaningful for
    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(invalid(format!("principal must be positive, got {}", self.principal)));
        }
        if self.interest_rate.is_negative() {
            return Err(invalid(format!("interest rate must not be negative, got {}", self.interest_rate)));
        }
        validate_fee_rule("late fee", &self.late_fee)?;
        validate_fee_rule("early repayment fee", &self.early_repayment_fee)?;
        if self.contracted_interest.is_negative() || self.contracted_fees.is_negative() {
            return Err(invalid("contracted interest and fees must not be negative"));
        }
        if self.total_payments == 0 {
            return Err(invalid("total payments must be at least 1"));
        }
        if self.installment_amount.map_or(false, |a| a.is_negative()) {
            return Err(invalid("installment amount must not be negative"));
        }
        Ok(())
    }
}

fn validate_fee_rule(name: &str, rule: &FeeRule) -> Result<()> {
    match rule {
        FeeRule::Fixed(amount) if amount.is_negative() => {
            Err(invalid(format!("{} must not be negative, got {}", name, amount)))
        }
        FeeRule::Percentage(pct) if *pct < Decimal::ZERO => {
            Err(invalid(format!("{} percentage must not be negative, got {}", name, pct)))
        }
        _ => Ok(()),
    }
}

fn invalid(message: impl Into<String>) -> ServicingError {
    ServicingError::InvalidConfiguration {
        message: message.into(),
    }
}

/// what to do with a payment larger than everything owed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverpaymentPolicy {
    /// refuse to approve; the payment stays pending
    #[default]
    Reject,
    /// cap principal at the remaining balance and record the rest as leftover
    RecordLeftover,
}

/// engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicingConfig {
    /// how long an approval waits for the loan lock
    pub lock_timeout_ms: u64,
    pub overpayment_policy: OverpaymentPolicy,
}

impl Default for ServicingConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 30_000,
            overpayment_policy: OverpaymentPolicy::Reject,
        }
    }
}

impl ServicingConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| invalid(e.to_string()))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personal_loan_preset() {
        let terms = LoanTerms::personal_loan(Money::from_major(1_000), Rate::from_percentage(12), 365);
        assert_eq!(terms.contracted_interest, Money::from_major(120));
        assert_eq!(terms.contracted_fees, Money::from_major(20));
        assert!(terms.allows_early_repayment);
        assert!(terms.validate().is_ok());
    }

    #[test]
    fn test_bridge_loan_preset() {
        let terms = LoanTerms::bridge_loan(Money::from_major(5_000), Rate::from_percentage(18), 60);
        assert_eq!(terms.interest_type, InterestType::Compound);
        assert_eq!(terms.interest_period, InterestPeriod::Daily);
        assert!(!terms.allows_early_repayment);
    }

    #[test]
    fn test_validation_rejects_bad_terms() {
        let base = LoanTerms::new(Money::from_major(1_000), Rate::from_percentage(10), 30);
        assert!(base.validate().is_ok());

        let zero = LoanTerms { principal: Money::ZERO, ..base.clone() };
        assert!(zero.validate().is_err());

        let negative_fee = base.clone().with_late_fee(FeeRule::Fixed(Money::from_major(-1)));
        assert!(negative_fee.validate().is_err());

        let negative_pct = base.clone().with_late_fee(FeeRule::Percentage(dec!(-2)));
        assert!(negative_pct.validate().is_err());

        let no_payments = LoanTerms { total_payments: 0, ..base.clone() };
        assert!(no_payments.validate().is_err());

        // zero duration is tolerated; the calculations guard against it
        let zero_duration = LoanTerms { duration_days: 0, ..base };
        assert!(zero_duration.validate().is_ok());
    }

    #[test]
    fn test_servicing_config_from_json() {
        let config = ServicingConfig::from_json(r#"{"overpayment_policy":"record_leftover"}"#).unwrap();
        assert_eq!(config.overpayment_policy, OverpaymentPolicy::RecordLeftover);
        assert_eq!(config.lock_timeout(), Duration::from_secs(30));

        assert!(ServicingConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_terms_round_trip_json() {
        let terms = LoanTerms::personal_loan(Money::from_major(1_000), Rate::from_percentage(12), 30);
        let json = serde_json::to_string(&terms).unwrap();
        let parsed: LoanTerms = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, terms);
    }
}
