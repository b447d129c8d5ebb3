use thiserror::Error;

use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus, PaymentId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServicingError {
    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("payment of {amount} exceeds outstanding balance {outstanding}")]
    Overpayment {
        amount: Money,
        outstanding: Money,
    },

    #[error("loan not accepting payments: current status is {status:?}")]
    LoanNotAcceptingPayments {
        status: LoanStatus,
    },

    #[error("invalid state: current {current}, expected {expected}")]
    InvalidState {
        current: String,
        expected: String,
    },

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: LoanStatus,
        to: LoanStatus,
    },

    #[error("activation requires start/end dates and disbursement details")]
    MissingActivationDetails,

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("payment not found: {id}")]
    PaymentNotFound {
        id: PaymentId,
    },

    #[error("transaction failed: {message}")]
    TransactionFailure {
        message: String,
    },

    #[error("timed out after {waited_ms}ms waiting for lock on loan {loan_id}")]
    LockTimeout {
        loan_id: LoanId,
        waited_ms: u64,
    },
}

impl ServicingError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServicingError::Validation {
            message: message.into(),
        }
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        ServicingError::TransactionFailure {
            message: message.into(),
        }
    }

    /// failures of the persistence boundary that may succeed on retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServicingError::TransactionFailure { .. } | ServicingError::LockTimeout { .. }
        )
    }

    /// the operation was valid but the record had already moved on
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            ServicingError::InvalidState { .. } | ServicingError::InvalidTransition { .. }
        )
    }

    /// rejected before any mutation because of malformed input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ServicingError::InvalidPaymentAmount { .. }
                | ServicingError::Validation { .. }
                | ServicingError::InvalidConfiguration { .. }
                | ServicingError::Overpayment { .. }
                | ServicingError::LoanNotAcceptingPayments { .. }
                | ServicingError::MissingActivationDetails
        )
    }
}

pub type Result<T> = std::result::Result<T, ServicingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_classification() {
        let timeout = ServicingError::LockTimeout {
            loan_id: Uuid::new_v4(),
            waited_ms: 30_000,
        };
        assert!(timeout.is_retryable());
        assert!(!timeout.is_validation());

        let state = ServicingError::InvalidState {
            current: "Completed".to_string(),
            expected: "Pending".to_string(),
        };
        assert!(state.is_invalid_state());
        assert!(!state.is_retryable());

        let amount = ServicingError::InvalidPaymentAmount { amount: Money::from_major(-5) };
        assert!(amount.is_validation());
        assert_eq!(amount.to_string(), "invalid payment amount: -5");
    }
}
