pub mod config;
pub mod credit;
pub mod decimal;
pub mod desk;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod settlement;
pub mod state;
pub mod store;
pub mod types;
pub mod valuation;

// re-export key types
pub use config::{EngineConfig, SystemParameters};
pub use credit::{CreditCheck, CreditLimitEvaluator};
pub use decimal::{Money, Rate};
pub use desk::{LoanDesk, Portfolio, QueuedPayment};
pub use errors::{ErrorKind, LoanError, Result};
pub use events::{Event, EventStore, LedgerSummary, LedgerTransaction, Notice};
pub use lifecycle::{LifecycleController, LoanRequest, Transition};
pub use settlement::{BalanceApplication, PaymentReview, SettlementProcess};
pub use state::{BankDetails, Loan, LoanEdit, LoanRow, LoanView, Payment};
pub use store::{
    InMemoryStore, LoanStore, ParameterSource, UserDirectory, UserLocks, WriteBatch,
};
pub use types::{
    Actor, LoanId, LoanStatus, PaymentId, PaymentStatus, Role, TransactionType, UserId,
};
pub use valuation::{PenaltyEngine, ReferenceCalendar, Valuation, ValuationEngine};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
