use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{LoanStatus, PaymentStatus};

/// coarse classification used by callers to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// caller-fixable input problem
    Validation,
    /// business rule denial with numeric context
    Policy,
    NotFound,
    /// operation does not fit the current state
    Conflict,
    /// elevated privilege required
    Forbidden,
    /// storage or other server-side failure
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    #[error("invalid amount: {amount} (must be greater than zero)")]
    InvalidAmount {
        amount: Money,
    },

    #[error("payment proof reference is required")]
    MissingProof,

    #[error("loan amount {requested} is below the minimum of {minimum}")]
    BelowMinLoanAmount {
        minimum: Money,
        requested: Money,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid record: {message}")]
    InvalidRecord {
        message: String,
    },

    #[error("maximum loan amount is {maximum}, requested {requested}")]
    AboveMaxLoanAmount {
        maximum: Money,
        requested: Money,
    },

    #[error("credit limit exceeded: total debt {projected_total} would exceed limit {limit} (available {available})")]
    CreditLimitExceeded {
        current_debt: Money,
        requested: Money,
        projected_total: Money,
        limit: Money,
        available: Money,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("payment not found: {id}")]
    PaymentNotFound {
        id: Uuid,
    },

    #[error("loan already approved")]
    AlreadyApproved,

    #[error("payment already completed")]
    AlreadyCompleted,

    #[error("invalid loan transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: LoanStatus,
        to: LoanStatus,
    },

    #[error("payment already reviewed: current status is {status:?}")]
    PaymentAlreadyReviewed {
        status: PaymentStatus,
    },

    #[error("loan does not accept payments: current status is {status:?}")]
    LoanNotPayable {
        status: LoanStatus,
    },

    #[error("admin access required to {operation}")]
    AdminRequired {
        operation: String,
    },

    #[error("access denied")]
    AccessDenied,

    #[error("storage failure")]
    Storage {
        detail: String,
    },
}

impl LoanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoanError::InvalidAmount { .. }
            | LoanError::MissingProof
            | LoanError::BelowMinLoanAmount { .. }
            | LoanError::InvalidConfiguration { .. }
            | LoanError::InvalidRecord { .. } => ErrorKind::Validation,
            LoanError::AboveMaxLoanAmount { .. } | LoanError::CreditLimitExceeded { .. } => {
                ErrorKind::Policy
            }
            LoanError::LoanNotFound { .. } | LoanError::PaymentNotFound { .. } => {
                ErrorKind::NotFound
            }
            LoanError::AlreadyApproved
            | LoanError::AlreadyCompleted
            | LoanError::InvalidTransition { .. }
            | LoanError::PaymentAlreadyReviewed { .. }
            | LoanError::LoanNotPayable { .. } => ErrorKind::Conflict,
            LoanError::AdminRequired { .. } | LoanError::AccessDenied => ErrorKind::Forbidden,
            LoanError::Storage { .. } => ErrorKind::Internal,
        }
    }

    /// http-equivalent status code; policy denials are plain bad requests
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::Policy => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    /// message safe to show a caller; internal details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            LoanError::Storage { .. } => "internal server error".to_string(),
            LoanError::LoanNotFound { .. } => "loan not found".to_string(),
            LoanError::PaymentNotFound { .. } => "payment not found".to_string(),
            other => other.to_string(),
        }
    }

    pub fn storage(detail: impl Into<String>) -> Self {
        LoanError::Storage {
            detail: detail.into(),
        }
    }

    pub fn admin_required(operation: &str) -> Self {
        LoanError::AdminRequired {
            operation: operation.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_limit_message_carries_context() {
        let err = LoanError::CreditLimitExceeded {
            current_debt: Money::from_major(8_000),
            requested: Money::from_major(3_000),
            projected_total: Money::from_major(11_000),
            limit: Money::from_major(10_000),
            available: Money::from_major(2_000),
        };

        assert_eq!(err.kind(), ErrorKind::Policy);
        assert_eq!(err.status_code(), 400);
        let message = err.public_message();
        assert!(message.contains("11000.00"));
        assert!(message.contains("10000.00"));
        assert!(message.contains("available 2000.00"));
    }

    #[test]
    fn test_storage_errors_are_opaque() {
        let err = LoanError::storage("connection refused at 10.0.0.3:5432");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.status_code(), 500);
        assert!(!err.public_message().contains("10.0.0.3"));
        assert!(!err.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn test_not_found_is_generic() {
        let err = LoanError::LoanNotFound { id: Uuid::new_v4() };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.public_message(), "loan not found");
    }

    #[test]
    fn test_conflicts() {
        assert_eq!(LoanError::AlreadyApproved.status_code(), 409);
        assert_eq!(LoanError::AlreadyCompleted.kind(), ErrorKind::Conflict);
        assert_eq!(LoanError::admin_required("approve loans").status_code(), 403);
    }
}
