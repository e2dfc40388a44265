use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::{Event, LedgerTransaction};
use crate::state::{Loan, Payment};
use crate::store::{LoanStore, UserLocks, WriteBatch};
use crate::types::{Actor, LoanId, LoanStatus, PaymentId, PaymentStatus, TransactionType};

/// outcome of applying an amount against a stored balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceApplication {
    pub new_balance: Money,
    /// part of the payment beyond the stored balance
    pub excess: Money,
}

impl BalanceApplication {
    /// payments reduce the stored balance only; unpaid penalty stays a computed view
    pub fn apply(balance: Money, amount: Money) -> Self {
        Self {
            new_balance: (balance - amount).floor_zero(),
            excess: (amount - balance).floor_zero(),
        }
    }

    pub fn settles(&self) -> bool {
        !self.new_balance.is_positive()
    }
}

/// a reviewed payment together with the loan it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReview {
    pub payment: Payment,
    pub loan: Loan,
    pub excess: Money,
    pub ledger: Option<LedgerTransaction>,
    pub events: Vec<Event>,
}

/// submission and review of proof-of-payment records
pub struct SettlementProcess<'a, S> {
    store: &'a S,
    locks: &'a UserLocks,
}

impl<'a, S: LoanStore> SettlementProcess<'a, S> {
    pub fn new(store: &'a S, locks: &'a UserLocks) -> Self {
        Self { store, locks }
    }

    fn fetch_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        self.store
            .payment(payment_id)?
            .ok_or(LoanError::PaymentNotFound { id: payment_id })
    }

    fn fetch_loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store
            .loan(loan_id)?
            .ok_or(LoanError::LoanNotFound { id: loan_id })
    }

    fn ensure_reviewable(payment: &Payment) -> Result<()> {
        match payment.status {
            PaymentStatus::Pending => Ok(()),
            PaymentStatus::Completed => Err(LoanError::AlreadyCompleted),
            status @ PaymentStatus::Rejected => Err(LoanError::PaymentAlreadyReviewed { status }),
        }
    }

    /// record a pending payment; the loan is not touched until review
    pub fn submit(
        &self,
        actor: &Actor,
        loan_id: LoanId,
        amount: Money,
        proof_reference: &str,
        time: &SafeTimeProvider,
    ) -> Result<(Payment, Event)> {
        if !amount.is_positive() {
            return Err(LoanError::InvalidAmount { amount });
        }
        let proof = proof_reference.trim();
        if proof.is_empty() {
            return Err(LoanError::MissingProof);
        }
        let loan = self.fetch_loan(loan_id)?;
        if !actor.can_act_for(loan.user_id) {
            return Err(LoanError::AccessDenied);
        }
        if !loan.accepts_payments() {
            return Err(LoanError::LoanNotPayable {
                status: loan.status,
            });
        }

        let now = time.now();
        let payment = Payment::submit(&loan, amount, proof.to_string(), now);
        self.store
            .commit(WriteBatch::new().put_payment(payment.clone()))?;

        tracing::info!(
            payment_id = %payment.id,
            loan_id = %loan.id,
            amount = %amount,
            "payment submitted for review"
        );

        let event = Event::PaymentSubmitted {
            payment_id: payment.id,
            loan_id: loan.id,
            amount,
            timestamp: now,
        };
        Ok((payment, event))
    }

    /// complete a pending payment and apply it against the loan's stored balance
    pub fn approve(
        &self,
        actor: &Actor,
        payment_id: PaymentId,
        time: &SafeTimeProvider,
    ) -> Result<PaymentReview> {
        if !actor.is_admin() {
            return Err(LoanError::admin_required("approve payments"));
        }
        let user_id = self.fetch_payment(payment_id)?.user_id;

        self.locks.serialize(user_id, || -> Result<PaymentReview> {
            let now = time.now();
            let mut payment = self.fetch_payment(payment_id)?;
            Self::ensure_reviewable(&payment)?;

            let mut loan = self.fetch_loan(payment.loan_id)?;
            if !loan.accepts_payments() {
                return Err(LoanError::LoanNotPayable {
                    status: loan.status,
                });
            }

            let applied = BalanceApplication::apply(loan.outstanding_balance, payment.amount);
            loan.outstanding_balance = applied.new_balance;
            loan.last_payment_date = Some(now);
            let settled = applied.settles() && loan.status.can_transition_to(LoanStatus::Paid);
            if settled {
                loan.update_status(LoanStatus::Paid, now);
            }
            payment.review(PaymentStatus::Completed, now);

            let ledger = LedgerTransaction::record(
                loan.user_id,
                loan.id,
                TransactionType::Payment,
                payment.amount,
                loan.outstanding_balance,
                format!("Payment of {} approved", payment.amount),
                now,
            );
            self.store.commit(
                WriteBatch::new()
                    .put_loan(loan.clone())
                    .put_payment(payment.clone())
                    .append_ledger(ledger.clone()),
            )?;

            tracing::info!(
                payment_id = %payment.id,
                loan_id = %loan.id,
                balance = %loan.outstanding_balance,
                settled,
                "payment completed"
            );
            if applied.excess.is_positive() {
                tracing::warn!(
                    payment_id = %payment.id,
                    excess = %applied.excess,
                    "payment exceeded the outstanding balance"
                );
            }

            let mut events = vec![Event::PaymentCompleted {
                payment_id: payment.id,
                loan_id: loan.id,
                amount: payment.amount,
                balance_after: loan.outstanding_balance,
                excess: applied.excess,
                timestamp: now,
            }];
            if settled {
                events.push(Event::LoanSettled {
                    loan_id: loan.id,
                    user_id: loan.user_id,
                    final_payment: payment.amount,
                    timestamp: now,
                });
            }

            Ok(PaymentReview {
                payment,
                loan,
                excess: applied.excess,
                ledger: Some(ledger),
                events,
            })
        })
    }

    /// decline a pending payment; the loan is left as it is
    pub fn reject(
        &self,
        actor: &Actor,
        payment_id: PaymentId,
        time: &SafeTimeProvider,
    ) -> Result<PaymentReview> {
        if !actor.is_admin() {
            return Err(LoanError::admin_required("reject payments"));
        }
        let user_id = self.fetch_payment(payment_id)?.user_id;

        self.locks.serialize(user_id, || -> Result<PaymentReview> {
            let now = time.now();
            let mut payment = self.fetch_payment(payment_id)?;
            Self::ensure_reviewable(&payment)?;
            let loan = self.fetch_loan(payment.loan_id)?;

            payment.review(PaymentStatus::Rejected, now);
            self.store
                .commit(WriteBatch::new().put_payment(payment.clone()))?;

            tracing::info!(payment_id = %payment.id, loan_id = %loan.id, "payment rejected");

            let event = Event::PaymentRejected {
                payment_id: payment.id,
                loan_id: loan.id,
                timestamp: now,
            };
            Ok(PaymentReview {
                payment,
                loan,
                excess: Money::ZERO,
                ledger: None,
                events: vec![event],
            })
        })
    }
}
