use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a payment attempt
pub type PaymentId = Uuid;

/// unique identifier for a ledger entry
pub type LedgerEntryId = Uuid;

/// reference to a payment method record owned elsewhere
pub type PaymentMethodId = Uuid;

/// authenticated user or agent acting on a loan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    /// the engine itself, for automatic transitions
    pub fn system() -> Self {
        Self {
            id: Uuid::nil(),
            name: "system".to_string(),
        }
    }
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// application received, awaiting decision
    Pending,
    /// approved but not yet disbursed
    Approved,
    /// application declined
    Rejected,
    /// disbursed and performing
    Active,
    /// behind on payments
    InArrears,
    /// written off as defaulted
    Defaulted,
    /// fully repaid
    Paid,
    /// withdrawn before completion
    Cancelled,
}

impl LoanStatus {
    /// no transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanStatus::Paid | LoanStatus::Defaulted | LoanStatus::Cancelled | LoanStatus::Rejected
        )
    }

    /// statuses under which repayments may be submitted and approved
    pub fn accepts_payments(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::InArrears)
    }
}

/// payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Rejected,
}

/// interest type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestType {
    Simple,
    Compound,
}

/// period in which interest is calculated and, for compound loans, compounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl InterestPeriod {
    /// days in one period
    pub fn day_count(&self) -> u32 {
        match self {
            InterestPeriod::Daily => 1,
            InterestPeriod::Weekly => 7,
            InterestPeriod::Monthly => 30,
            InterestPeriod::Yearly => 365,
        }
    }

    /// periods in one year; the annual rate is split evenly across them
    pub fn periods_per_year(&self) -> u32 {
        match self {
            InterestPeriod::Daily => 365,
            InterestPeriod::Weekly => 52,
            InterestPeriod::Monthly => 12,
            InterestPeriod::Yearly => 1,
        }
    }
}

/// how a fee is charged; fixed and percentage are exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum FeeRule {
    #[default]
    None,
    /// flat amount
    Fixed(Money),
    /// percent of the current balance (2.5 for 2.5%)
    Percentage(Decimal),
}

impl FeeRule {
    /// fee charged against `balance`
    pub fn amount(&self, balance: Money) -> Money {
        match self {
            FeeRule::None => Money::ZERO,
            FeeRule::Fixed(amount) => amount.clamp_non_negative(),
            FeeRule::Percentage(pct) => balance.clamp_non_negative().percentage(*pct),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FeeRule::None)
    }
}

/// how a single payment was split across the waterfall buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaymentAllocation {
    pub to_late_fee: Money,
    pub to_early_fee: Money,
    pub to_loan_fees: Money,
    pub to_interest: Money,
    pub to_principal: Money,
    /// amount no bucket could absorb
    pub leftover: Money,
}

impl PaymentAllocation {
    /// all fee buckets together
    pub fn total_fees(&self) -> Money {
        self.to_late_fee + self.to_early_fee + self.to_loan_fees
    }

    /// everything except the leftover
    pub fn total_applied(&self) -> Money {
        self.total_fees() + self.to_interest + self.to_principal
    }

    /// applied plus leftover; always equals the gross payment
    pub fn gross(&self) -> Money {
        self.total_applied() + self.leftover
    }
}

/// disbursement details required to activate a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationDetails {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub disbursement_method: String,
    pub disbursement_reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_terminal_statuses() {
        for status in [LoanStatus::Paid, LoanStatus::Defaulted, LoanStatus::Cancelled, LoanStatus::Rejected] {
            assert!(status.is_terminal());
            assert!(!status.accepts_payments());
        }
        assert!(LoanStatus::Active.accepts_payments());
        assert!(LoanStatus::InArrears.accepts_payments());
        assert!(!LoanStatus::Approved.accepts_payments());
    }

    #[test]
    fn test_fee_rule_amounts() {
        let balance = Money::from_major(1_000);
        assert_eq!(FeeRule::None.amount(balance), Money::ZERO);
        assert_eq!(FeeRule::Fixed(Money::from_major(25)).amount(balance), Money::from_major(25));
        assert_eq!(FeeRule::Percentage(dec!(1.5)).amount(balance), Money::from_major(15));
        assert_eq!(FeeRule::Percentage(dec!(1.5)).amount(Money::from_major(-10)), Money::ZERO);
    }

    #[test]
    fn test_fee_rule_serialization() {
        let json = serde_json::to_string(&FeeRule::Fixed(Money::from_major(25))).unwrap();
        assert_eq!(json, r#"{"kind":"fixed","value":"25"}"#);
        let parsed: FeeRule = serde_json::from_str(r#"{"kind":"percentage","value":"2.5"}"#).unwrap();
        assert_eq!(parsed, FeeRule::Percentage(dec!(2.5)));
    }

    #[test]
    fn test_period_conventions() {
        assert_eq!(InterestPeriod::Monthly.day_count(), 30);
        assert_eq!(InterestPeriod::Monthly.periods_per_year(), 12);
        assert_eq!(InterestPeriod::Yearly.day_count(), 365);
    }

    #[test]
    fn test_allocation_totals() {
        let allocation = PaymentAllocation {
            to_late_fee: Money::from_major(25),
            to_early_fee: Money::ZERO,
            to_loan_fees: Money::from_major(5),
            to_interest: Money::from_major(12),
            to_principal: Money::from_major(58),
            leftover: Money::from_major(3),
        };
        assert_eq!(allocation.total_fees(), Money::from_major(30));
        assert_eq!(allocation.total_applied(), Money::from_major(100));
        assert_eq!(allocation.gross(), Money::from_major(103));
    }
}
