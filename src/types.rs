use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a borrower
pub type UserId = Uuid;

/// unique identifier for a submitted payment
pub type PaymentId = Uuid;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// applied, waiting for review
    Pending,
    /// approved, interest folded into the balance
    Approved,
    /// treated the same as approved
    Active,
    /// fully repaid
    Paid,
    /// declined by an admin
    Rejected,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Active => "active",
            LoanStatus::Paid => "paid",
            LoanStatus::Rejected => "rejected",
        }
    }

    /// approved and active are interchangeable for valuation
    pub fn is_approved(&self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Paid | LoanStatus::Rejected)
    }

    /// whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            LoanStatus::Pending => matches!(
                next,
                LoanStatus::Approved | LoanStatus::Active | LoanStatus::Rejected
            ),
            LoanStatus::Approved | LoanStatus::Active => matches!(
                next,
                LoanStatus::Approved | LoanStatus::Active | LoanStatus::Paid
            ),
            LoanStatus::Paid | LoanStatus::Rejected => false,
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(LoanStatus::Pending),
            "approved" => Ok(LoanStatus::Approved),
            "active" => Ok(LoanStatus::Active),
            "paid" => Ok(LoanStatus::Paid),
            "rejected" => Ok(LoanStatus::Rejected),
            other => Err(format!("unknown loan status '{}'", other)),
        }
    }
}

/// review status of a submitted payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Rejected,
}

/// ledger transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    LoanApplication,
    LoanApproved,
    Payment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::LoanApplication => "loan_application",
            TransactionType::LoanApproved => "loan_approved",
            TransactionType::Payment => "payment",
        }
    }
}

/// caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Borrower,
    Admin,
}

/// authenticated caller of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn borrower(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Borrower,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// admins act on anyone's records, borrowers only on their own
    pub fn can_act_for(&self, owner: UserId) -> bool {
        self.is_admin() || self.user_id == owner
    }
}
