pub mod schedule;
pub mod waterfall;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{Result, ServicingError};
use crate::types::{
    Actor, LedgerEntryId, LoanId, PaymentAllocation, PaymentId, PaymentMethodId, PaymentStatus,
};

pub use schedule::{next_due_amount, next_due_date, ScheduleProjection};
pub use waterfall::{allocate, apply_waterfall, AmountsDue, WaterfallBucket};

/// repayment request from a borrower or agent
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSubmission {
    pub amount: Money,
    pub payment_method_id: PaymentMethodId,
    pub due_date: Option<NaiveDate>,
    pub attachment_reference: Option<String>,
}

impl PaymentSubmission {
    pub fn new(amount: Money, payment_method_id: PaymentMethodId) -> Self {
        Self {
            amount,
            payment_method_id,
            due_date: None,
            attachment_reference: None,
        }
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_attachment(mut self, reference: impl Into<String>) -> Self {
        self.attachment_reference = Some(reference.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(ServicingError::InvalidPaymentAmount { amount: self.amount });
        }
        if self.payment_method_id.is_nil() {
            return Err(ServicingError::validation("payment method is required"));
        }
        Ok(())
    }
}

/// a repayment against a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPayment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub payment_method_id: PaymentMethodId,
    pub status: PaymentStatus,
    /// set once, when the payment completes
    pub allocation: Option<PaymentAllocation>,
    pub due_date: Option<NaiveDate>,
    pub attachment_reference: Option<String>,
    pub submitted_by: Actor,
    pub submitted_at: DateTime<Utc>,
    pub approved_by: Option<Actor>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Actor>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl LoanPayment {
    pub fn submitted(
        loan_id: LoanId,
        submission: PaymentSubmission,
        submitted_by: Actor,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            amount: submission.amount,
            payment_method_id: submission.payment_method_id,
            status: PaymentStatus::Pending,
            allocation: None,
            due_date: submission.due_date,
            attachment_reference: submission.attachment_reference,
            submitted_by,
            submitted_at,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// only pending payments may be decided
    pub fn ensure_pending(&self) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(ServicingError::InvalidState {
                current: format!("payment {:?}", self.status),
                expected: "payment Pending".to_string(),
            })
        }
    }

    pub fn complete(&mut self, allocation: PaymentAllocation, approver: &Actor, at: DateTime<Utc>) -> Result<()> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Completed;
        self.allocation = Some(allocation);
        self.approved_by = Some(approver.clone());
        self.approved_at = Some(at);
        Ok(())
    }

    pub fn reject(&mut self, reason: impl Into<String>, rejected_by: &Actor, at: DateTime<Utc>) -> Result<()> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Rejected;
        self.rejected_by = Some(rejected_by.clone());
        self.rejected_at = Some(at);
        self.rejection_reason = Some(reason.into());
        Ok(())
    }

    pub fn interest_amount(&self) -> Money {
        self.allocation.map_or(Money::ZERO, |a| a.to_interest)
    }

    pub fn principal_amount(&self) -> Money {
        self.allocation.map_or(Money::ZERO, |a| a.to_principal)
    }

    pub fn fees_amount(&self) -> Money {
        self.allocation.map_or(Money::ZERO, |a| a.total_fees())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Disbursement { method: String, reference: String },
    Repayment { payment_id: PaymentId },
}

/// money movement recorded against a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub loan_id: LoanId,
    pub kind: LedgerEntryKind,
    pub amount: Money,
    pub allocation: Option<PaymentAllocation>,
    pub recorded_by: Actor,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn disbursement(
        loan_id: LoanId,
        amount: Money,
        method: String,
        reference: String,
        recorded_by: &Actor,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            kind: LedgerEntryKind::Disbursement { method, reference },
            amount,
            allocation: None,
            recorded_by: recorded_by.clone(),
            recorded_at,
        }
    }

    /// entry mirroring a completed payment
    pub fn repayment(payment: &LoanPayment, recorded_by: &Actor, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id: payment.loan_id,
            kind: LedgerEntryKind::Repayment { payment_id: payment.id },
            amount: payment.amount,
            allocation: payment.allocation,
            recorded_by: recorded_by.clone(),
            recorded_at,
        }
    }

    pub fn payment_id(&self) -> Option<PaymentId> {
        match self.kind {
            LedgerEntryKind::Repayment { payment_id } => Some(payment_id),
            LedgerEntryKind::Disbursement { .. } => None,
        }
    }
}
