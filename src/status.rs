use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{Result, ServicingError};
use crate::events::Event;
use crate::state::Loan;
use crate::types::{ActivationDetails, Actor, LoanStatus};

/// requested change to a loan's lifecycle status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StatusRequest {
    Approve,
    Reject { reason: String },
    Activate(ActivationDetails),
    MarkInArrears,
    /// back to active once arrears are cleared
    Reinstate,
    MarkDefaulted { reason: String },
    MarkPaid,
    Cancel { reason: String },
}

impl StatusRequest {
    pub fn target(&self) -> LoanStatus {
        match self {
            StatusRequest::Approve => LoanStatus::Approved,
            StatusRequest::Reject { .. } => LoanStatus::Rejected,
            StatusRequest::Activate(_) => LoanStatus::Active,
            StatusRequest::MarkInArrears => LoanStatus::InArrears,
            StatusRequest::Reinstate => LoanStatus::Active,
            StatusRequest::MarkDefaulted { .. } => LoanStatus::Defaulted,
            StatusRequest::MarkPaid => LoanStatus::Paid,
            StatusRequest::Cancel { .. } => LoanStatus::Cancelled,
        }
    }

    fn reason(&self) -> Option<String> {
        match self {
            StatusRequest::Reject { reason }
            | StatusRequest::MarkDefaulted { reason }
            | StatusRequest::Cancel { reason } => Some(reason.clone()),
            _ => None,
        }
    }
}

/// a transition that was applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: LoanStatus,
    pub to: LoanStatus,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusTransition {
    pub fn event(&self, loan: &Loan, actor: &Actor) -> Event {
        Event::StatusChanged {
            loan_id: loan.id,
            old_status: self.from,
            new_status: self.to,
            reason: self.reason.clone(),
            changed_by: actor.id,
            timestamp: self.timestamp,
        }
    }
}

/// whether `from -> to` is a legal lifecycle move
pub fn can_transition(from: LoanStatus, to: LoanStatus) -> bool {
    use LoanStatus::*;

    matches!(
        (from, to),
        (Pending, Approved | Rejected | Cancelled)
            | (Approved, Active | Cancelled)
            | (Active, InArrears | Defaulted | Paid | Cancelled)
            | (InArrears, Active | Defaulted | Paid)
    )
}

/// statuses reachable from `from`
pub fn allowed_targets(from: LoanStatus) -> Vec<LoanStatus> {
    use LoanStatus::*;

    [Pending, Approved, Rejected, Active, InArrears, Defaulted, Paid, Cancelled]
        .into_iter()
        .filter(|to| can_transition(from, *to))
        .collect()
}

/// Apply `request` to `loan`, stamping the matching timestamp.
///
/// Activation also records the disbursement details and opens the balance.
/// The loan is left untouched on error.
pub fn transition(loan: &mut Loan, request: StatusRequest, at: DateTime<Utc>) -> Result<StatusTransition> {
    let from = loan.status;
    let to = request.target();

    // reinstating only makes sense out of arrears
    let legal = match &request {
        StatusRequest::Reinstate => from == LoanStatus::InArrears,
        StatusRequest::Activate(_) => from == LoanStatus::Approved,
        _ => can_transition(from, to),
    };
    if !legal {
        warn!(loan_id = %loan.id, ?from, ?to, "status transition refused");
        return Err(ServicingError::InvalidTransition { from, to });
    }

    let reason = request.reason();
    match request {
        StatusRequest::Activate(details) => activate(loan, details, at)?,
        StatusRequest::Approve => loan.approved_at = Some(at),
        StatusRequest::Reject { .. } => loan.rejected_at = Some(at),
        StatusRequest::MarkInArrears => loan.in_arrears_at = Some(at),
        StatusRequest::Reinstate => loan.in_arrears_at = None,
        StatusRequest::MarkDefaulted { .. } => loan.defaulted_at = Some(at),
        StatusRequest::MarkPaid => loan.paid_at = Some(at),
        StatusRequest::Cancel { .. } => loan.cancelled_at = Some(at),
    }

    loan.update_status(to, at);
    loan.status_reason = reason.clone();

    info!(loan_id = %loan.id, ?from, ?to, "loan status changed");

    Ok(StatusTransition {
        from,
        to,
        reason,
        timestamp: at,
    })
}

fn activate(loan: &mut Loan, details: ActivationDetails, at: DateTime<Utc>) -> Result<()> {
    if details.disbursement_method.trim().is_empty()
        || details.disbursement_reference.trim().is_empty()
        || details.end_date < details.start_date
    {
        return Err(ServicingError::MissingActivationDetails);
    }

    loan.start_date = Some(details.start_date);
    loan.end_date = Some(details.end_date);
    loan.disbursement_method = Some(details.disbursement_method);
    loan.disbursement_reference = Some(details.disbursement_reference);
    loan.activated_at = Some(at);
    loan.ledger.open(loan.terms.principal);
    Ok(())
}
