use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus, PaymentAllocation, PaymentId};

/// all events that can be emitted by the servicing engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // payment events
    LoanPaymentSubmitted {
        loan_id: LoanId,
        payment_id: PaymentId,
        amount: Money,
        submitted_by: Uuid,
        timestamp: DateTime<Utc>,
    },
    LoanPaymentCompleted {
        loan_id: LoanId,
        payment_id: PaymentId,
        amount: Money,
        allocation: PaymentAllocation,
        principal_remaining: Money,
        approved_by: Uuid,
        timestamp: DateTime<Utc>,
    },
    LoanPaymentRejected {
        loan_id: LoanId,
        payment_id: PaymentId,
        reason: String,
        rejected_by: Uuid,
        timestamp: DateTime<Utc>,
    },

    // lifecycle events
    LoanDisbursed {
        loan_id: LoanId,
        amount: Money,
        method: String,
        reference: String,
        timestamp: DateTime<Utc>,
    },
    LoanPaid {
        loan_id: LoanId,
        payment_id: PaymentId,
        total_principal_paid: Money,
        total_interest_paid: Money,
        total_fees_paid: Money,
        timestamp: DateTime<Utc>,
    },

    // status change events
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        reason: Option<String>,
        changed_by: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Event::LoanPaymentSubmitted { loan_id, .. }
            | Event::LoanPaymentCompleted { loan_id, .. }
            | Event::LoanPaymentRejected { loan_id, .. }
            | Event::LoanDisbursed { loan_id, .. }
            | Event::LoanPaid { loan_id, .. }
            | Event::StatusChanged { loan_id, .. } => *loan_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::LoanPaymentSubmitted { .. } => "loan_payment_submitted",
            Event::LoanPaymentCompleted { .. } => "loan_payment_completed",
            Event::LoanPaymentRejected { .. } => "loan_payment_rejected",
            Event::LoanDisbursed { .. } => "loan_disbursed",
            Event::LoanPaid { .. } => "loan_paid",
            Event::StatusChanged { .. } => "status_changed",
        }
    }
}

/// event store for collecting events during operations
///
/// Events staged here are only handed to a publisher once the transaction
/// that produced them has committed.
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// downstream consumer of committed events
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: Event);

    fn publish_all(&self, events: Vec<Event>) {
        for event in events {
            self.publish(event);
        }
    }
}

/// publisher that keeps every event in memory
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<Event>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, loan_id: LoanId) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.loan_id() == loan_id)
            .cloned()
            .collect()
    }

    /// number of events with the given name
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }
}

impl EventPublisher for InMemoryEventLog {
    fn publish(&self, event: Event) {
        self.events.lock().push(event);
    }
}
