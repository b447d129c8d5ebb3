//! serialization support for loans

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::payments::LoanPayment;
use crate::state::Loan;
use crate::types::{LoanId, LoanStatus, PaymentStatus};

/// serializable view of a loan's servicing state
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub status: LoanStatus,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub financial: FinancialView,
    pub payments: PaymentView,
    pub metadata: MetadataView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinancialView {
    pub principal: Money,
    pub principal_remaining: Money,
    pub current_balance: Money,
    pub contracted_interest: Money,
    pub contracted_fees: Money,
    pub overpayment_credit: Money,
    pub interest_rate: Rate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentView {
    pub total_principal_paid: Money,
    pub total_interest_paid: Money,
    pub total_fees_paid: Money,
    pub completed_payments: u32,
    pub pending_payments: usize,
    pub last_payment_date: Option<NaiveDate>,
    pub last_payment_amount: Option<Money>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub next_payment_due_amount: Option<Money>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetadataView {
    pub interest_type: String,
    pub interest_period: String,
    pub duration_days: u32,
    pub grace_period_days: u32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl LoanView {
    pub fn from_loan(loan: &Loan, payments: &[LoanPayment]) -> Self {
        let ledger = &loan.ledger;
        LoanView {
            id: loan.id,
            status: loan.status,
            currency: loan.terms.currency.clone(),
            created_at: loan.created_at,
            activated_at: loan.activated_at,
            paid_at: loan.paid_at,
            financial: FinancialView {
                principal: loan.terms.principal,
                principal_remaining: ledger.principal_remaining,
                current_balance: ledger.current_balance,
                contracted_interest: loan.terms.contracted_interest,
                contracted_fees: loan.terms.contracted_fees,
                overpayment_credit: ledger.overpayment_credit,
                interest_rate: loan.terms.interest_rate,
            },
            payments: PaymentView {
                total_principal_paid: ledger.principal_paid,
                total_interest_paid: ledger.interest_paid,
                total_fees_paid: ledger.fees_paid,
                completed_payments: ledger.completed_payments,
                pending_payments: payments
                    .iter()
                    .filter(|p| p.status == PaymentStatus::Pending)
                    .count(),
                last_payment_date: ledger.last_payment_date,
                last_payment_amount: ledger.last_payment_amount,
                next_payment_due_date: ledger.next_payment_due_date,
                next_payment_due_amount: ledger.next_payment_due_amount,
            },
            metadata: MetadataView {
                interest_type: format!("{:?}", loan.terms.interest_type),
                interest_period: format!("{:?}", loan.terms.interest_period),
                duration_days: loan.terms.duration_days,
                grace_period_days: loan.terms.grace_period_days,
                start_date: loan.start_date,
                end_date: loan.end_date,
            },
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
