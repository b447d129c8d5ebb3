pub mod config;
pub mod dates;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod fees;
pub mod interest;
pub mod payments;
pub mod servicer;
pub mod state;
pub mod status;
pub mod store;
pub mod types;
pub mod view;

// re-export key types
pub use config::{LoanTerms, OverpaymentPolicy, ServicingConfig};
pub use decimal::{Money, Rate};
pub use errors::{Result, ServicingError};
pub use events::{Event, EventPublisher, EventStore, InMemoryEventLog};
pub use fees::{FeeAssessment, FeePolicy};
pub use interest::{CompoundAccrual, InterestAccrual, InterestCalculation, InterestCalculator, SimpleAccrual};
pub use payments::{
    allocate, apply_waterfall, next_due_amount, next_due_date, AmountsDue, LedgerEntry,
    LedgerEntryKind, LoanPayment, PaymentSubmission, ScheduleProjection,
};
pub use servicer::{ApprovalOutcome, Assessment, LoanServicer, PayoffQuote};
pub use state::{Loan, LoanLedger};
pub use status::{StatusRequest, StatusTransition};
pub use store::{InMemoryStore, LoanStore, LoanTransaction};
pub use types::{
    ActivationDetails, Actor, FeeRule, InterestPeriod, InterestType, LoanId, LoanStatus,
    PaymentAllocation, PaymentId, PaymentMethodId, PaymentStatus,
};
pub use view::LoanView;

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
