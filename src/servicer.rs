use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{LoanTerms, OverpaymentPolicy, ServicingConfig};
use crate::decimal::Money;
use crate::errors::{Result, ServicingError};
use crate::events::{Event, EventPublisher, EventStore};
use crate::fees::{FeeAssessment, FeePolicy};
use crate::interest::{accrual_start, InterestAccrual, InterestCalculation};
use crate::payments::{schedule, waterfall, AmountsDue, LedgerEntry, LoanPayment, PaymentSubmission};
use crate::state::Loan;
use crate::status::{self, StatusRequest};
use crate::store::{LoanStore, LoanTransaction};
use crate::types::{ActivationDetails, Actor, LoanId, LoanStatus, PaymentAllocation, PaymentId};
use crate::view::LoanView;

/// what a loan owes on a given day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub as_of: NaiveDate,
    pub fees: FeeAssessment,
    pub interest: InterestCalculation,
    pub loan_fees: Money,
    pub principal: Money,
}

impl Assessment {
    pub fn amounts_due(&self) -> AmountsDue {
        AmountsDue {
            late_fee: self.fees.late_fee,
            early_fee: self.fees.early_fee,
            loan_fees: self.loan_fees,
            interest: self.interest.interest_amount,
            principal: Some(self.principal),
        }
    }

    pub fn total(&self) -> Money {
        self.fees.total() + self.loan_fees + self.interest.interest_amount + self.principal
    }
}

/// amount that settles a loan today, by bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffQuote {
    pub loan_id: LoanId,
    pub as_of: NaiveDate,
    pub late_fee: Money,
    pub early_fee: Money,
    pub loan_fees: Money,
    pub interest: Money,
    pub principal: Money,
    pub total: Money,
}

/// result of approving a payment
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalOutcome {
    pub payment: LoanPayment,
    pub loan: Loan,
    pub entry: LedgerEntry,
    pub assessment: Assessment,
    pub paid_off: bool,
}

impl ApprovalOutcome {
    pub fn allocation(&self) -> PaymentAllocation {
        self.payment.allocation.unwrap_or_default()
    }
}

/// Evaluate fees and interest for `loan` as of `today`.
pub fn assess(loan: &Loan, today: NaiveDate) -> Result<Assessment> {
    let start = loan.servicing_start()?;
    let balance = loan.ledger.current_balance;

    let fees = FeePolicy::new(&loan.terms).evaluate(start, today, balance);
    let interest = InterestAccrual::new(&loan.terms).interest_due(
        balance,
        accrual_start(start, loan.ledger.last_payment_date),
        today,
    );

    Ok(Assessment {
        as_of: today,
        fees,
        interest,
        loan_fees: loan.loan_fees_outstanding(),
        principal: loan.ledger.principal_remaining.clamp_non_negative(),
    })
}

/// Loan servicing use cases: payment submission and approval, status
/// changes and payoff quotes.
///
/// Every mutation runs in one store transaction under the loan's lock. Events
/// are staged while the transaction runs and published only after it commits.
pub struct LoanServicer<'a, S: LoanStore, P: EventPublisher> {
    store: &'a S,
    publisher: &'a P,
    time: &'a SafeTimeProvider,
    config: ServicingConfig,
}

impl<'a, S: LoanStore, P: EventPublisher> LoanServicer<'a, S, P> {
    pub fn new(store: &'a S, publisher: &'a P, time: &'a SafeTimeProvider, config: ServicingConfig) -> Self {
        Self {
            store,
            publisher,
            time,
            config,
        }
    }

    pub fn config(&self) -> &ServicingConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        crate::dates::today(self.time)
    }

    /// Run `work` in a transaction on `loan_id`, publishing its staged events
    /// once committed.
    fn in_transaction<T, F>(&self, loan_id: LoanId, work: F) -> Result<T>
    where
        F: FnOnce(&mut LoanTransaction, &mut EventStore) -> Result<T>,
    {
        let mut staged = EventStore::new();
        let value = self
            .store
            .transaction(loan_id, self.config.lock_timeout(), |tx| work(tx, &mut staged))?;
        self.publisher.publish_all(staged.take_events());
        Ok(value)
    }

    /// register a new loan application
    pub fn open_loan(&self, borrower_id: Uuid, terms: LoanTerms) -> Result<Loan> {
        terms.validate()?;
        let loan = Loan::new(borrower_id, terms, self.time.now());
        self.store.insert_loan(loan.clone())?;

        info!(loan_id = %loan.id, principal = %loan.terms.principal, "loan opened");
        Ok(loan)
    }

    pub fn loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store.loan(loan_id)
    }

    pub fn payment(&self, payment_id: PaymentId) -> Result<LoanPayment> {
        self.store.payment(payment_id)
    }

    pub fn view(&self, loan_id: LoanId) -> Result<LoanView> {
        let loan = self.store.loan(loan_id)?;
        let payments = self.store.payments_for_loan(loan_id)?;
        Ok(LoanView::from_loan(&loan, &payments))
    }

    /// Administrator-driven lifecycle change.
    ///
    /// Marking a loan paid by hand is only accepted once it meets the payoff
    /// test; approvals normally do it automatically.
    pub fn change_status(&self, loan_id: LoanId, request: StatusRequest, actor: &Actor) -> Result<Loan> {
        let now = self.time.now();

        self.in_transaction(loan_id, |tx, events| {
            let loan = tx.loan_mut();
            if request == StatusRequest::MarkPaid && !loan.meets_payoff() {
                return Err(ServicingError::InvalidState {
                    current: "outstanding balance".to_string(),
                    expected: "loan meeting payoff".to_string(),
                });
            }

            let change = status::transition(loan, request, now)?;
            events.emit(change.event(loan, actor));

            if change.to == LoanStatus::Active && change.from == LoanStatus::Approved {
                let loan = tx.loan().clone();
                let method = loan.disbursement_method.clone().unwrap_or_default();
                let reference = loan.disbursement_reference.clone().unwrap_or_default();

                if let Some(projection) = schedule::project(&loan, now.date_naive()) {
                    let ledger = &mut tx.loan_mut().ledger;
                    ledger.next_payment_due_date = Some(projection.due_date);
                    ledger.next_payment_due_amount = Some(projection.due_amount);
                }

                tx.record_entry(LedgerEntry::disbursement(
                    loan.id,
                    loan.terms.principal,
                    method.clone(),
                    reference.clone(),
                    actor,
                    now,
                ));
                events.emit(Event::LoanDisbursed {
                    loan_id: loan.id,
                    amount: loan.terms.principal,
                    method,
                    reference,
                    timestamp: now,
                });
            }

            Ok(tx.loan().clone())
        })
    }

    /// approve, then disburse
    pub fn activate(&self, loan_id: LoanId, details: ActivationDetails, actor: &Actor) -> Result<Loan> {
        self.change_status(loan_id, StatusRequest::Activate(details), actor)
    }

    /// record a pending repayment against an active loan
    pub fn submit_payment(&self, loan_id: LoanId, submission: PaymentSubmission, actor: &Actor) -> Result<LoanPayment> {
        submission.validate()?;
        let now = self.time.now();

        let payment = self.in_transaction(loan_id, |tx, events| {
            let status = tx.loan().status;
            if !status.accepts_payments() {
                return Err(ServicingError::LoanNotAcceptingPayments { status });
            }

            let payment = LoanPayment::submitted(loan_id, submission, actor.clone(), now);
            tx.insert_payment(payment.clone())?;

            events.emit(Event::LoanPaymentSubmitted {
                loan_id,
                payment_id: payment.id,
                amount: payment.amount,
                submitted_by: actor.id,
                timestamp: now,
            });
            Ok(payment)
        })?;

        info!(%loan_id, payment_id = %payment.id, amount = %payment.amount, "payment submitted");
        Ok(payment)
    }

    /// Approve a pending payment.
    ///
    /// Allocates the amount through the waterfall, updates the ledger, projects
    /// the next due payment, records the repayment entry and settles the loan
    /// on full payoff. Nothing is persisted or published if any step fails.
    pub fn approve_payment(&self, payment_id: PaymentId, approver: &Actor) -> Result<ApprovalOutcome> {
        let loan_id = self.store.loan_id_for_payment(payment_id)?;
        let now = self.time.now();
        let today = now.date_naive();
        let policy = self.config.overpayment_policy;

        let outcome = self.in_transaction(loan_id, |tx, events| {
            let payment = tx.payment(payment_id)?;
            if let Err(e) = payment.ensure_pending() {
                warn!(%payment_id, status = ?payment.status, "payment already decided");
                return Err(e);
            }
            let amount = payment.amount;

            let loan = tx.loan();
            if !loan.can_accept_payment() {
                return Err(ServicingError::LoanNotAcceptingPayments { status: loan.status });
            }

            let assessment = assess(loan, today)?;
            let due = assessment.amounts_due();
            let allocation = waterfall::apply_waterfall(amount, &due);

            if allocation.leftover.is_positive() {
                match policy {
                    OverpaymentPolicy::Reject => {
                        warn!(%payment_id, %amount, leftover = %allocation.leftover, "overpayment refused");
                        return Err(ServicingError::Overpayment {
                            amount,
                            outstanding: assessment.total(),
                        });
                    }
                    OverpaymentPolicy::RecordLeftover => {
                        info!(%payment_id, leftover = %allocation.leftover, "overpayment credited");
                    }
                }
            }

            let (loan, payment) = tx.loan_and_payment_mut(payment_id)?;
            let principal = loan.principal();
            loan.ledger = loan.ledger.apply_allocation(principal, &allocation, amount, today);
            if !loan.ledger.is_consistent(principal) {
                return Err(ServicingError::transaction("ledger balances diverged"));
            }

            payment.complete(allocation, approver, now)?;

            let paid_off = loan.meets_payoff();
            if paid_off {
                let change = status::transition(loan, StatusRequest::MarkPaid, now)?;
                events.emit(change.event(loan, approver));
                events.emit(Event::LoanPaid {
                    loan_id,
                    payment_id,
                    total_principal_paid: loan.ledger.principal_paid,
                    total_interest_paid: loan.ledger.interest_paid,
                    total_fees_paid: loan.ledger.fees_paid,
                    timestamp: now,
                });
                loan.ledger.next_payment_due_date = None;
                loan.ledger.next_payment_due_amount = Some(Money::ZERO);
            } else if let Some(projection) = schedule::project(loan, today) {
                loan.ledger.next_payment_due_date = Some(projection.due_date);
                loan.ledger.next_payment_due_amount = Some(projection.due_amount);
            }

            events.emit(Event::LoanPaymentCompleted {
                loan_id,
                payment_id,
                amount,
                allocation,
                principal_remaining: loan.ledger.principal_remaining,
                approved_by: approver.id,
                timestamp: now,
            });

            let entry = LedgerEntry::repayment(payment, approver, now);
            let payment = payment.clone();
            tx.record_entry(entry.clone());

            Ok(ApprovalOutcome {
                payment,
                loan: tx.loan().clone(),
                entry,
                assessment,
                paid_off,
            })
        })?;

        info!(
            %loan_id,
            %payment_id,
            to_fees = %outcome.allocation().total_fees(),
            to_interest = %outcome.allocation().to_interest,
            to_principal = %outcome.allocation().to_principal,
            principal_remaining = %outcome.loan.ledger.principal_remaining,
            "payment approved"
        );
        if outcome.paid_off {
            info!(%loan_id, "loan paid off");
        }

        Ok(outcome)
    }

    /// reject a pending payment; the loan is untouched
    pub fn reject_payment(&self, payment_id: PaymentId, reason: &str, actor: &Actor) -> Result<LoanPayment> {
        let loan_id = self.store.loan_id_for_payment(payment_id)?;
        let now = self.time.now();

        let payment = self.in_transaction(loan_id, |tx, events| {
            let payment = tx.payment_mut(payment_id)?;
            payment.reject(reason, actor, now)?;

            events.emit(Event::LoanPaymentRejected {
                loan_id,
                payment_id,
                reason: reason.to_string(),
                rejected_by: actor.id,
                timestamp: now,
            });
            Ok(payment.clone())
        })?;

        info!(%loan_id, %payment_id, reason, "payment rejected");
        Ok(payment)
    }

    /// amount that would settle the loan today
    pub fn payoff_quote(&self, loan_id: LoanId) -> Result<PayoffQuote> {
        let loan = self.store.loan(loan_id)?;
        if !loan.can_accept_payment() {
            return Err(ServicingError::LoanNotAcceptingPayments { status: loan.status });
        }

        let assessment = assess(&loan, self.today())?;
        Ok(PayoffQuote {
            loan_id,
            as_of: assessment.as_of,
            late_fee: assessment.fees.late_fee,
            early_fee: assessment.fees.early_fee,
            loan_fees: assessment.loan_fees,
            interest: assessment.interest.interest_amount,
            principal: assessment.principal,
            total: assessment.total(),
        })
    }
}
