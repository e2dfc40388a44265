use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SystemParameters;
use crate::decimal::{Money, Rate};
use crate::types::{LoanId, LoanStatus, PaymentId, TransactionType, UserId};

/// all events that can be emitted by the desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanApplied {
        loan_id: LoanId,
        user_id: UserId,
        amount: Money,
        interest_rate: Rate,
        due_date: DateTime<Utc>,
        submitted_by: UserId,
    },
    LoanApproved {
        loan_id: LoanId,
        user_id: UserId,
        principal: Money,
        interest: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
    LoanRejected {
        loan_id: LoanId,
        user_id: UserId,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },
    LoanEdited {
        loan_id: LoanId,
        fields: Vec<String>,
        old_status: LoanStatus,
        new_status: LoanStatus,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        user_id: UserId,
        final_payment: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentSubmitted {
        payment_id: PaymentId,
        loan_id: LoanId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentCompleted {
        payment_id: PaymentId,
        loan_id: LoanId,
        amount: Money,
        balance_after: Money,
        excess: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentRejected {
        payment_id: PaymentId,
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },

    // administration
    ParametersUpdated {
        old: SystemParameters,
        new: SystemParameters,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
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

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// append-only ledger row, written in the same batch as the state it records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub user_id: UserId,
    pub loan_id: LoanId,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub balance_after: Money,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    pub fn record(
        user_id: UserId,
        loan_id: LoanId,
        transaction_type: TransactionType,
        amount: Money,
        balance_after: Money,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            loan_id,
            transaction_type,
            amount,
            balance_after,
            description: description.into(),
            created_at,
        }
    }
}

/// aggregate statistics over a set of ledger rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_transactions: usize,
    pub loan_applications: usize,
    pub total_loan_amount: Money,
    pub payments: usize,
    pub total_payment_amount: Money,
    /// newest first
    pub recent: Vec<LedgerTransaction>,
}

impl LedgerSummary {
    pub const RECENT_LIMIT: usize = 10;

    pub fn from_transactions(transactions: &[LedgerTransaction]) -> Self {
        let applications: Vec<&LedgerTransaction> = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::LoanApplication)
            .collect();
        let payments: Vec<&LedgerTransaction> = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Payment)
            .collect();

        let mut recent = transactions.to_vec();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(Self::RECENT_LIMIT);

        Self {
            total_transactions: transactions.len(),
            loan_applications: applications.len(),
            total_loan_amount: applications.iter().map(|t| t.amount).sum(),
            payments: payments.len(),
            total_payment_amount: payments.iter().map(|t| t.amount).sum(),
            recent,
        }
    }
}

/// borrower-facing notice produced by the due-date scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    /// repayment falls due tomorrow in the reference calendar
    DueSoon {
        loan_id: LoanId,
        user_id: UserId,
        due_on: NaiveDate,
        amount_due: Money,
    },
    /// loan is overdue and accruing penalty
    PenaltyAlert {
        loan_id: LoanId,
        user_id: UserId,
        days_overdue: u32,
        penalty_amount: Money,
        total_due: Money,
    },
}

impl Notice {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Notice::DueSoon { loan_id, .. } | Notice::PenaltyAlert { loan_id, .. } => *loan_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_event_store_drains() {
        let mut store = EventStore::new();
        store.emit(Event::PaymentRejected {
            payment_id: Uuid::new_v4(),
            loan_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        });
        assert_eq!(store.events().len(), 1);

        let drained = store.take_events();
        assert_eq!(drained.len(), 1);
        assert!(store.events().is_empty());
    }

    #[test]
    fn test_ledger_summary() {
        let user = Uuid::new_v4();
        let loan = Uuid::new_v4();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut rows = vec![
            LedgerTransaction::record(
                user,
                loan,
                TransactionType::LoanApplication,
                Money::from_major(20_000),
                Money::from_major(20_000),
                "applied",
                start,
            ),
            LedgerTransaction::record(
                user,
                loan,
                TransactionType::LoanApproved,
                Money::from_major(20_000),
                Money::from_major(21_000),
                "approved",
                start + Duration::hours(1),
            ),
        ];
        for i in 0..11 {
            rows.push(LedgerTransaction::record(
                user,
                loan,
                TransactionType::Payment,
                Money::from_major(100),
                Money::from_major(21_000 - 100 * (i + 1)),
                "payment",
                start + Duration::days(i + 1),
            ));
        }

        let summary = LedgerSummary::from_transactions(&rows);
        assert_eq!(summary.total_transactions, 13);
        assert_eq!(summary.loan_applications, 1);
        assert_eq!(summary.total_loan_amount, Money::from_major(20_000));
        assert_eq!(summary.payments, 11);
        assert_eq!(summary.total_payment_amount, Money::from_major(1_100));
        assert_eq!(summary.recent.len(), LedgerSummary::RECENT_LIMIT);
        assert_eq!(summary.recent[0].created_at, start + Duration::days(11));
    }
}
