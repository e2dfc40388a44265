use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::config::SystemParameters;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::LedgerTransaction;
use crate::state::{Loan, Payment};
use crate::store::{LoanStore, ParameterSource, UserDirectory, WriteBatch};
use crate::types::{LoanId, PaymentId, PaymentStatus, UserId};

#[derive(Debug, Default)]
struct Tables {
    loans: HashMap<LoanId, Loan>,
    payments: HashMap<PaymentId, Payment>,
    ledger: Vec<LedgerTransaction>,
    credit_limits: HashMap<UserId, Money>,
    parameters: SystemParameters,
}

/// in-process store backing tests and demos
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters(params: SystemParameters) -> Self {
        let store = Self::new();
        store.tables.write().parameters = params;
        store
    }

    pub fn set_credit_limit(&self, user_id: UserId, limit: Money) {
        self.tables.write().credit_limits.insert(user_id, limit);
    }

    /// insert a loan directly, bypassing the lifecycle
    pub fn seed_loan(&self, loan: Loan) {
        self.tables.write().loans.insert(loan.id, loan);
    }

    /// make every call fail as if the backing database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn loan_count(&self) -> usize {
        self.tables.read().loans.len()
    }

    fn loans_where(&self, keep: impl Fn(&Loan) -> bool) -> Result<Vec<Loan>> {
        self.ensure_available()?;
        let mut loans: Vec<Loan> = self
            .tables
            .read()
            .loans
            .values()
            .filter(|l| keep(l))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.application_date.cmp(&a.application_date));
        Ok(loans)
    }

    fn payments_where(&self, keep: impl Fn(&Payment) -> bool) -> Result<Vec<Payment>> {
        self.ensure_available()?;
        let mut payments: Vec<Payment> = self
            .tables
            .read()
            .payments
            .values()
            .filter(|p| keep(p))
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(payments)
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(LoanError::storage("in-memory store marked unavailable"))
        } else {
            Ok(())
        }
    }
}

impl LoanStore for InMemoryStore {
    fn loan(&self, id: LoanId) -> Result<Option<Loan>> {
        self.ensure_available()?;
        Ok(self.tables.read().loans.get(&id).cloned())
    }

    fn loans_for_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        self.loans_where(|l| l.user_id == user_id)
    }

    fn all_loans(&self) -> Result<Vec<Loan>> {
        self.loans_where(|_| true)
    }

    fn outstanding_loans(&self) -> Result<Vec<Loan>> {
        self.ensure_available()?;
        let mut loans: Vec<Loan> = self
            .tables
            .read()
            .loans
            .values()
            .filter(|l| l.status.is_approved() && l.outstanding_balance.is_positive())
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(loans)
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.ensure_available()?;
        Ok(self.tables.read().payments.get(&id).cloned())
    }

    fn payments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Payment>> {
        self.payments_where(|p| p.loan_id == loan_id)
    }

    fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>> {
        self.payments_where(|p| p.user_id == user_id)
    }

    fn pending_payments(&self) -> Result<Vec<Payment>> {
        self.payments_where(|p| p.status == PaymentStatus::Pending)
    }

    fn ledger_for_user(&self, user_id: UserId) -> Result<Vec<LedgerTransaction>> {
        self.ensure_available()?;
        let mut rows: Vec<LedgerTransaction> = self
            .tables
            .read()
            .ledger
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    fn ledger(&self) -> Result<Vec<LedgerTransaction>> {
        self.ensure_available()?;
        let mut rows = self.tables.read().ledger.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.ensure_available()?;
        if let Some(loan) = batch.loans.iter().find(|l| l.outstanding_balance.is_negative()) {
            return Err(LoanError::storage(format!(
                "balance check constraint violated for loan {}",
                loan.id
            )));
        }

        let mut tables = self.tables.write();
        for loan in batch.loans {
            tables.loans.insert(loan.id, loan);
        }
        for payment in batch.payments {
            tables.payments.insert(payment.id, payment);
        }
        tables.ledger.extend(batch.ledger);
        Ok(())
    }
}

impl UserDirectory for InMemoryStore {
    fn credit_limit(&self, user_id: UserId) -> Result<Option<Money>> {
        self.ensure_available()?;
        Ok(self.tables.read().credit_limits.get(&user_id).copied())
    }
}

impl ParameterSource for InMemoryStore {
    fn system_parameters(&self) -> Result<SystemParameters> {
        self.ensure_available()?;
        Ok(self.tables.read().parameters.clone())
    }

    fn store_parameters(&self, params: SystemParameters) -> Result<()> {
        self.ensure_available()?;
        self.tables.write().parameters = params;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::{LoanStatus, TransactionType};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn loan(user_id: UserId) -> Loan {
        Loan::new_application(
            user_id,
            Money::from_major(5_000),
            Rate::from_percentage(5),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            28,
            String::new(),
        )
    }

    #[test]
    fn test_commit_writes_everything() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let loan = loan(user);
        let entry = LedgerTransaction::record(
            user,
            loan.id,
            TransactionType::LoanApplication,
            loan.principal,
            loan.outstanding_balance,
            "applied",
            loan.application_date,
        );

        store
            .commit(WriteBatch::new().put_loan(loan.clone()).append_ledger(entry))
            .unwrap();

        assert_eq!(store.loan(loan.id).unwrap(), Some(loan));
        assert_eq!(store.loans_for_user(user).unwrap().len(), 1);
        assert_eq!(store.ledger_for_user(user).unwrap().len(), 1);
    }

    #[test]
    fn test_rejected_batch_writes_nothing() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let good = loan(user);
        let mut bad = loan(user);
        bad.outstanding_balance = Money::from_major(-1);

        let result = store.commit(WriteBatch::new().put_loan(good).put_loan(bad));
        assert!(matches!(result, Err(LoanError::Storage { .. })));
        assert_eq!(store.loan_count(), 0);
    }

    #[test]
    fn test_unavailable_store_fails_closed() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        assert!(store.system_parameters().is_err());
        assert!(store.commit(WriteBatch::new().put_loan(loan(Uuid::new_v4()))).is_err());

        store.set_unavailable(false);
        assert_eq!(store.loan_count(), 0);
    }

    #[test]
    fn test_outstanding_loans_filter() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();

        let pending = loan(user);
        let mut approved = loan(user);
        approved.status = LoanStatus::Approved;
        let mut paid = loan(user);
        paid.status = LoanStatus::Paid;
        paid.outstanding_balance = Money::ZERO;

        for l in [pending, approved.clone(), paid] {
            store.seed_loan(l);
        }

        let outstanding = store.outstanding_loans().unwrap();
        assert_eq!(outstanding.len(), 1);
        assert_eq!(outstanding[0].id, approved.id);
        assert_eq!(store.credit_limit(user).unwrap(), None);
    }

    #[test]
    fn test_payment_queries() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let first = loan(user);
        let second = loan(user);
        let other = loan(Uuid::new_v4());
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let early = Payment::submit(&first, Money::from_major(100), "a".to_string(), start);
        let mut reviewed = Payment::submit(&second, Money::from_major(200), "b".to_string(), start);
        reviewed.review(PaymentStatus::Completed, start);
        let late = Payment::submit(
            &other,
            Money::from_major(300),
            "c".to_string(),
            start + chrono::Duration::hours(1),
        );
        let mut batch = WriteBatch::new();
        for l in [first, second, other] {
            batch = batch.put_loan(l);
        }
        for p in [early.clone(), reviewed.clone(), late.clone()] {
            batch = batch.put_payment(p);
        }
        store.commit(batch).unwrap();

        let history = store.payments_for_user(user).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|p| p.user_id == user));

        let queue = store.pending_payments().unwrap();
        assert_eq!(
            queue.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![late.id, early.id]
        );
        assert_eq!(store.all_loans().unwrap().len(), 3);
    }
}
