use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LoanTerms;
use crate::decimal::Money;
use crate::errors::{Result, ServicingError};
use crate::types::{LoanId, LoanStatus, PaymentAllocation};

/// running financial totals of a loan
///
/// Only [`LoanLedger::apply_allocation`] moves money between these fields, so
/// `principal_paid + principal_remaining == principal` and
/// `current_balance == principal_remaining` hold after every committed payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanLedger {
    pub principal_paid: Money,
    pub interest_paid: Money,
    /// every fee collected: late, early repayment and fixed loan fees
    pub fees_paid: Money,
    /// portion of `fees_paid` that retired the contracted loan fees
    pub loan_fees_paid: Money,
    pub principal_remaining: Money,
    pub current_balance: Money,
    /// payments received beyond everything owed
    pub overpayment_credit: Money,
    pub completed_payments: u32,
    pub last_payment_date: Option<NaiveDate>,
    pub last_payment_amount: Option<Money>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub next_payment_due_amount: Option<Money>,
}

impl LoanLedger {
    /// ledger of a loan that has not been disbursed
    pub fn new(principal: Money) -> Self {
        Self {
            principal_paid: Money::ZERO,
            interest_paid: Money::ZERO,
            fees_paid: Money::ZERO,
            loan_fees_paid: Money::ZERO,
            principal_remaining: principal,
            current_balance: Money::ZERO,
            overpayment_credit: Money::ZERO,
            completed_payments: 0,
            last_payment_date: None,
            last_payment_amount: None,
            next_payment_due_date: None,
            next_payment_due_amount: None,
        }
    }

    /// balance becomes live on disbursement
    pub fn open(&mut self, principal: Money) {
        self.principal_remaining = principal - self.principal_paid;
        self.current_balance = self.principal_remaining;
    }

    /// ledger after one approved payment
    pub fn apply_allocation(
        &self,
        principal: Money,
        allocation: &PaymentAllocation,
        amount: Money,
        paid_on: NaiveDate,
    ) -> LoanLedger {
        let mut next = self.clone();

        next.principal_paid += allocation.to_principal;
        next.interest_paid += allocation.to_interest;
        next.fees_paid += allocation.total_fees();
        next.loan_fees_paid += allocation.to_loan_fees;
        next.overpayment_credit += allocation.leftover;

        next.principal_remaining = principal - next.principal_paid;
        next.current_balance = next.principal_remaining;

        next.completed_payments += 1;
        next.last_payment_date = Some(paid_on);
        next.last_payment_amount = Some(amount);

        next
    }

    /// total collected against principal, interest and fees
    pub fn total_collected(&self) -> Money {
        self.principal_paid + self.interest_paid + self.fees_paid
    }

    pub fn is_consistent(&self, principal: Money) -> bool {
        self.principal_paid + self.principal_remaining == principal
            && self.current_balance == self.principal_remaining
    }
}

/// the servicing record of one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower_id: Uuid,
    pub terms: LoanTerms,
    pub status: LoanStatus,
    pub ledger: LoanLedger,

    // disbursement
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub disbursement_method: Option<String>,
    pub disbursement_reference: Option<String>,

    // status timestamps
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub in_arrears_at: Option<DateTime<Utc>>,
    pub defaulted_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub last_status_change: DateTime<Utc>,
    pub status_reason: Option<String>,

    /// bumped on every committed change
    pub version: u64,
}

impl Loan {
    /// new loan application
    pub fn new(borrower_id: Uuid, terms: LoanTerms, created_at: DateTime<Utc>) -> Self {
        let ledger = LoanLedger::new(terms.principal);
        Self {
            id: Uuid::new_v4(),
            borrower_id,
            terms,
            status: LoanStatus::Pending,
            ledger,
            start_date: None,
            end_date: None,
            disbursement_method: None,
            disbursement_reference: None,
            created_at,
            approved_at: None,
            rejected_at: None,
            activated_at: None,
            in_arrears_at: None,
            defaulted_at: None,
            paid_at: None,
            cancelled_at: None,
            last_status_change: created_at,
            status_reason: None,
            version: 0,
        }
    }

    pub fn principal(&self) -> Money {
        self.terms.principal
    }

    /// start date of a disbursed loan
    pub fn servicing_start(&self) -> Result<NaiveDate> {
        self.start_date.ok_or_else(|| ServicingError::InvalidState {
            current: format!("{:?} without start date", self.status),
            expected: "active loan with start date".to_string(),
        })
    }

    /// contracted loan fees not yet collected
    pub fn loan_fees_outstanding(&self) -> Money {
        (self.terms.contracted_fees - self.ledger.loan_fees_paid).clamp_non_negative()
    }

    /// Full payoff: collections cover principal plus contracted interest and
    /// fees, or no principal remains.
    pub fn meets_payoff(&self) -> bool {
        let contracted_total =
            self.terms.principal + self.terms.contracted_interest + self.terms.contracted_fees;
        self.ledger.total_collected() >= contracted_total
            || !self.ledger.principal_remaining.is_positive()
    }

    pub fn is_fully_paid(&self) -> bool {
        self.status == LoanStatus::Paid
    }

    pub fn can_accept_payment(&self) -> bool {
        self.status.accepts_payments()
    }

    /// record a status change
    pub fn update_status(&mut self, new_status: LoanStatus, timestamp: DateTime<Utc>) {
        self.status = new_status;
        self.last_status_change = timestamp;
    }
}
