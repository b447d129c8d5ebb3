//! persistence boundary for loans, their payments and ledger entries
//!
//! Every mutation runs inside [`LoanStore::transaction`], which holds an
//! exclusive per-loan lock and hands the closure a working copy of the loan's
//! rows. The copy is written back only when the closure returns `Ok`; any error
//! discards it, leaving the stored rows exactly as they were.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::errors::{Result, ServicingError};
use crate::payments::{LedgerEntry, LoanPayment};
use crate::state::Loan;
use crate::types::{LoanId, LoanStatus, PaymentId};

/// working copy of one loan's rows inside a transaction
#[derive(Debug, Clone)]
pub struct LoanTransaction {
    loan: Loan,
    payments: HashMap<PaymentId, LoanPayment>,
    new_entries: Vec<LedgerEntry>,
    new_payments: Vec<PaymentId>,
}

impl LoanTransaction {
    pub fn loan(&self) -> &Loan {
        &self.loan
    }

    pub fn loan_mut(&mut self) -> &mut Loan {
        &mut self.loan
    }

    pub fn payment(&self, payment_id: PaymentId) -> Result<&LoanPayment> {
        self.payments
            .get(&payment_id)
            .ok_or(ServicingError::PaymentNotFound { id: payment_id })
    }

    pub fn payment_mut(&mut self, payment_id: PaymentId) -> Result<&mut LoanPayment> {
        self.payments
            .get_mut(&payment_id)
            .ok_or(ServicingError::PaymentNotFound { id: payment_id })
    }

    /// both the loan and one of its payments, mutably
    pub fn loan_and_payment_mut(&mut self, payment_id: PaymentId) -> Result<(&mut Loan, &mut LoanPayment)> {
        let payment = self
            .payments
            .get_mut(&payment_id)
            .ok_or(ServicingError::PaymentNotFound { id: payment_id })?;
        Ok((&mut self.loan, payment))
    }

    pub fn insert_payment(&mut self, payment: LoanPayment) -> Result<()> {
        if payment.loan_id != self.loan.id {
            return Err(ServicingError::validation("payment belongs to a different loan"));
        }
        self.new_payments.push(payment.id);
        self.payments.insert(payment.id, payment);
        Ok(())
    }

    pub fn record_entry(&mut self, entry: LedgerEntry) {
        self.new_entries.push(entry);
    }

    /// entries recorded so far in this transaction
    pub fn pending_entries(&self) -> &[LedgerEntry] {
        &self.new_entries
    }
}

/// storage for the servicing engine
pub trait LoanStore: Send + Sync {
    fn insert_loan(&self, loan: Loan) -> Result<()>;

    fn loan(&self, loan_id: LoanId) -> Result<Loan>;

    fn payment(&self, payment_id: PaymentId) -> Result<LoanPayment>;

    /// loan owning `payment_id`
    fn loan_id_for_payment(&self, payment_id: PaymentId) -> Result<LoanId>;

    fn payments_for_loan(&self, loan_id: LoanId) -> Result<Vec<LoanPayment>>;

    fn ledger_entries(&self, loan_id: LoanId) -> Result<Vec<LedgerEntry>>;

    fn loans_with_status(&self, status: LoanStatus) -> Vec<Loan>;

    /// Run `work` against the loan's rows under its exclusive lock.
    ///
    /// Fails with [`ServicingError::LockTimeout`] when the lock is not
    /// acquired within `timeout`. Changes persist only if `work` succeeds.
    fn transaction<T, F>(&self, loan_id: LoanId, timeout: Duration, work: F) -> Result<T>
    where
        F: FnOnce(&mut LoanTransaction) -> Result<T>;
}

#[derive(Debug)]
struct LoanRow {
    loan: Loan,
    payments: HashMap<PaymentId, LoanPayment>,
    entries: Vec<LedgerEntry>,
}

/// in-process store with one lock per loan
#[derive(Debug, Default)]
pub struct InMemoryStore {
    loans: RwLock<HashMap<LoanId, Arc<Mutex<LoanRow>>>>,
    payment_index: RwLock<HashMap<PaymentId, LoanId>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, loan_id: LoanId) -> Result<Arc<Mutex<LoanRow>>> {
        self.loans
            .read()
            .get(&loan_id)
            .cloned()
            .ok_or(ServicingError::LoanNotFound { id: loan_id })
    }

    fn all_rows(&self) -> Vec<Arc<Mutex<LoanRow>>> {
        self.loans.read().values().cloned().collect()
    }

    pub fn loan_count(&self) -> usize {
        self.loans.read().len()
    }
}

impl LoanStore for InMemoryStore {
    fn insert_loan(&self, loan: Loan) -> Result<()> {
        let mut loans = self.loans.write();
        if loans.contains_key(&loan.id) {
            return Err(ServicingError::validation(format!("loan {} already exists", loan.id)));
        }
        let row = LoanRow {
            loan: loan.clone(),
            payments: HashMap::new(),
            entries: Vec::new(),
        };
        loans.insert(loan.id, Arc::new(Mutex::new(row)));
        Ok(())
    }

    fn loan(&self, loan_id: LoanId) -> Result<Loan> {
        let row = self.row(loan_id)?;
        let guard = row.lock();
        Ok(guard.loan.clone())
    }

    fn payment(&self, payment_id: PaymentId) -> Result<LoanPayment> {
        let loan_id = self.loan_id_for_payment(payment_id)?;
        let row = self.row(loan_id)?;
        let guard = row.lock();
        guard
            .payments
            .get(&payment_id)
            .cloned()
            .ok_or(ServicingError::PaymentNotFound { id: payment_id })
    }

    fn loan_id_for_payment(&self, payment_id: PaymentId) -> Result<LoanId> {
        self.payment_index
            .read()
            .get(&payment_id)
            .copied()
            .ok_or(ServicingError::PaymentNotFound { id: payment_id })
    }

    fn payments_for_loan(&self, loan_id: LoanId) -> Result<Vec<LoanPayment>> {
        let row = self.row(loan_id)?;
        let guard = row.lock();
        let mut payments: Vec<LoanPayment> = guard.payments.values().cloned().collect();
        payments.sort_by_key(|p| p.submitted_at);
        Ok(payments)
    }

    fn ledger_entries(&self, loan_id: LoanId) -> Result<Vec<LedgerEntry>> {
        let row = self.row(loan_id)?;
        let guard = row.lock();
        Ok(guard.entries.clone())
    }

    fn loans_with_status(&self, status: LoanStatus) -> Vec<Loan> {
        self.all_rows()
            .iter()
            .map(|row| row.lock().loan.clone())
            .filter(|loan| loan.status == status)
            .collect()
    }

    fn transaction<T, F>(&self, loan_id: LoanId, timeout: Duration, work: F) -> Result<T>
    where
        F: FnOnce(&mut LoanTransaction) -> Result<T>,
    {
        let row = self.row(loan_id)?;
        let mut guard = row.try_lock_for(timeout).ok_or_else(|| {
            warn!(%loan_id, timeout_ms = timeout.as_millis() as u64, "loan lock not acquired");
            ServicingError::LockTimeout {
                loan_id,
                waited_ms: timeout.as_millis() as u64,
            }
        })?;

        let mut tx = LoanTransaction {
            loan: guard.loan.clone(),
            payments: guard.payments.clone(),
            new_entries: Vec::new(),
            new_payments: Vec::new(),
        };

        let value = match work(&mut tx) {
            Ok(value) => value,
            Err(e) => {
                warn!(%loan_id, error = %e, "transaction rolled back");
                return Err(e);
            }
        };

        let LoanTransaction {
            mut loan,
            payments,
            new_entries,
            new_payments,
        } = tx;

        loan.version = guard.loan.version + 1;
        guard.loan = loan;
        guard.payments = payments;
        guard.entries.extend(new_entries);

        if !new_payments.is_empty() {
            let mut index = self.payment_index.write();
            for payment_id in new_payments {
                index.insert(payment_id, loan_id);
            }
        }

        debug!(%loan_id, version = guard.loan.version, "transaction committed");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::config::LoanTerms;
    use crate::decimal::{Money, Rate};
    use crate::payments::PaymentSubmission;
    use crate::types::Actor;

    const TIMEOUT: Duration = Duration::from_millis(200);

    fn stored_loan(store: &InMemoryStore) -> LoanId {
        let loan = Loan::new(
            Uuid::new_v4(),
            LoanTerms::new(Money::from_major(1_000), Rate::from_percentage(10), 30),
            Utc::now(),
        );
        let id = loan.id;
        store.insert_loan(loan).unwrap();
        id
    }

    fn payment_for(loan_id: LoanId) -> LoanPayment {
        LoanPayment::submitted(
            loan_id,
            PaymentSubmission::new(Money::from_major(100), Uuid::new_v4()),
            Actor::new("borrower"),
            Utc::now(),
        )
    }

    #[test]
    fn test_commit_persists_and_indexes() {
        let store = InMemoryStore::new();
        let loan_id = stored_loan(&store);
        let payment = payment_for(loan_id);
        let payment_id = payment.id;

        store
            .transaction(loan_id, TIMEOUT, |tx| tx.insert_payment(payment))
            .unwrap();

        assert_eq!(store.loan_id_for_payment(payment_id).unwrap(), loan_id);
        assert_eq!(store.payment(payment_id).unwrap().amount, Money::from_major(100));
        assert_eq!(store.payments_for_loan(loan_id).unwrap().len(), 1);
        assert_eq!(store.loan(loan_id).unwrap().version, 1);
    }

    #[test]
    fn test_error_rolls_back_everything() {
        let store = InMemoryStore::new();
        let loan_id = stored_loan(&store);
        let payment = payment_for(loan_id);
        let payment_id = payment.id;

        let result: Result<()> = store.transaction(loan_id, TIMEOUT, |tx| {
            tx.insert_payment(payment)?;
            tx.loan_mut().ledger.principal_paid = Money::from_major(100);
            Err(ServicingError::transaction("write failed"))
        });

        assert!(result.is_err());
        assert!(store.payment(payment_id).is_err());
        let loan = store.loan(loan_id).unwrap();
        assert_eq!(loan.ledger.principal_paid, Money::ZERO);
        assert_eq!(loan.version, 0);
    }

    #[test]
    fn test_lock_timeout() {
        let store = InMemoryStore::new();
        let loan_id = stored_loan(&store);

        let result = store.transaction(loan_id, TIMEOUT, |_| {
            // a nested transaction on the same loan cannot get the lock
            let inner = store.transaction(loan_id, Duration::from_millis(10), |_| Ok(()));
            Ok(inner)
        });

        let inner = result.unwrap();
        assert!(matches!(inner, Err(ServicingError::LockTimeout { .. })));
        assert!(inner.unwrap_err().is_retryable());
    }

    #[test]
    fn test_missing_rows() {
        let store = InMemoryStore::new();
        let unknown = Uuid::new_v4();

        assert_eq!(store.loan(unknown), Err(ServicingError::LoanNotFound { id: unknown }));
        assert_eq!(store.payment(unknown), Err(ServicingError::PaymentNotFound { id: unknown }));
        assert!(store.transaction(unknown, TIMEOUT, |_| Ok(())).is_err());
    }

    #[test]
    fn test_duplicate_loan_and_foreign_payment() {
        let store = InMemoryStore::new();
        let loan_id = stored_loan(&store);
        let loan = store.loan(loan_id).unwrap();
        assert!(store.insert_loan(loan).is_err());

        let foreign = payment_for(Uuid::new_v4());
        let result = store.transaction(loan_id, TIMEOUT, |tx| tx.insert_payment(foreign));
        assert!(result.unwrap_err().is_validation());
    }

    #[test]
    fn test_status_query() {
        let store = InMemoryStore::new();
        stored_loan(&store);
        stored_loan(&store);

        assert_eq!(store.loans_with_status(LoanStatus::Pending).len(), 2);
        assert!(store.loans_with_status(LoanStatus::Active).is_empty());
        assert_eq!(store.loan_count(), 2);
    }
}
