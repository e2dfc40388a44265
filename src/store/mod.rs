pub mod locks;
pub mod memory;

use crate::config::SystemParameters;
use crate::decimal::Money;
use crate::errors::Result;
use crate::events::LedgerTransaction;
use crate::state::{Loan, Payment};
use crate::types::{LoanId, PaymentId, UserId};

pub use locks::UserLocks;
pub use memory::InMemoryStore;

/// everything one state transition writes; committed all-or-nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub loans: Vec<Loan>,
    pub payments: Vec<Payment>,
    pub ledger: Vec<LedgerTransaction>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_loan(mut self, loan: Loan) -> Self {
        self.loans.push(loan);
        self
    }

    pub fn put_payment(mut self, payment: Payment) -> Self {
        self.payments.push(payment);
        self
    }

    pub fn append_ledger(mut self, entry: LedgerTransaction) -> Self {
        self.ledger.push(entry);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty() && self.payments.is_empty() && self.ledger.is_empty()
    }
}

/// persisted loans, payments and the ledger
pub trait LoanStore: Send + Sync {
    fn loan(&self, id: LoanId) -> Result<Option<Loan>>;

    fn loans_for_user(&self, user_id: UserId) -> Result<Vec<Loan>>;

    /// every loan, newest application first
    fn all_loans(&self) -> Result<Vec<Loan>>;

    /// approved or active loans with a positive stored balance
    fn outstanding_loans(&self) -> Result<Vec<Loan>>;

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>>;

    fn payments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Payment>>;

    fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>>;

    /// payments awaiting review, newest first
    fn pending_payments(&self) -> Result<Vec<Payment>>;

    fn ledger_for_user(&self, user_id: UserId) -> Result<Vec<LedgerTransaction>>;

    fn ledger(&self) -> Result<Vec<LedgerTransaction>>;

    /// apply every write in the batch or none of them
    fn commit(&self, batch: WriteBatch) -> Result<()>;
}

/// read-only view of user records owned elsewhere
pub trait UserDirectory: Send + Sync {
    /// `None` when the user has no limit configured
    fn credit_limit(&self, user_id: UserId) -> Result<Option<Money>>;
}

/// the singleton lending parameters
pub trait ParameterSource: Send + Sync {
    fn system_parameters(&self) -> Result<SystemParameters>;

    fn store_parameters(&self, params: SystemParameters) -> Result<()>;
}
