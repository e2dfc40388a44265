use chrono::Duration;
use hourglass_rs::SafeTimeProvider;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, SystemParameters};
use crate::credit::{CreditCheck, CreditLimitEvaluator};
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore, LedgerSummary, LedgerTransaction, Notice};
use crate::lifecycle::{LifecycleController, LoanRequest, Transition};
use crate::settlement::{PaymentReview, SettlementProcess};
use crate::state::{Loan, LoanEdit, LoanRow, LoanView, Payment};
use crate::store::{LoanStore, ParameterSource, UserDirectory, UserLocks, WriteBatch};
use crate::types::{Actor, LoanId, LoanStatus, PaymentId, TransactionType, UserId};
use crate::valuation::{Valuation, ValuationEngine};

/// a user's open loans and how much of their limit they use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub user_id: UserId,
    pub loans: Vec<LoanView>,
    pub total_due: Money,
    pub overdue_loans: usize,
    pub credit_limit: Money,
    pub available_credit: Money,
    pub utilization_rate: Rate,
}

impl Portfolio {
    /// total due as a share of the limit, for display
    pub fn utilization_percent(&self) -> Decimal {
        self.utilization_rate.as_percentage().round_dp(2)
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// a payment awaiting review with the loan it was submitted against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedPayment {
    pub payment: Payment,
    /// `None` when the loan no longer exists
    pub loan_amount: Option<Money>,
    pub loan_status: Option<LoanStatus>,
}

/// entry point for every loan, payment and parameter operation
pub struct LoanDesk<S> {
    store: S,
    config: EngineConfig,
    locks: UserLocks,
    events: Mutex<EventStore>,
}

impl<S> LoanDesk<S>
where
    S: LoanStore + UserDirectory + ParameterSource,
{
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            locks: UserLocks::new(),
            events: Mutex::new(EventStore::new()),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// drain the domain events emitted since the last call
    pub fn take_events(&self) -> Vec<Event> {
        self.events.lock().take_events()
    }

    fn lifecycle(&self) -> LifecycleController<'_, S> {
        LifecycleController::new(&self.store, &self.locks, &self.config)
    }

    fn settlement(&self) -> SettlementProcess<'_, S> {
        SettlementProcess::new(&self.store, &self.locks)
    }

    fn emit_all(&self, events: Vec<Event>) {
        let mut store = self.events.lock();
        for event in events {
            store.emit(event);
        }
    }

    /// log internal failures with their detail before they leave the desk opaque
    fn observe<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            match err {
                LoanError::Storage { detail } => {
                    tracing::error!(operation, error = %detail, "storage failure");
                }
                other => {
                    tracing::debug!(operation, error = %other, "operation refused");
                }
            }
        }
        result
    }

    fn record(&self, operation: &'static str, result: Result<Transition>) -> Result<Loan> {
        let transition = self.observe(operation, result)?;
        self.emit_all(transition.events);
        Ok(transition.loan)
    }

    fn fetch_loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store
            .loan(loan_id)?
            .ok_or(LoanError::LoanNotFound { id: loan_id })
    }

    fn require_admin(actor: &Actor, operation: &str) -> Result<()> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(LoanError::admin_required(operation))
        }
    }

    // valuation and credit

    /// valuation engine for the current parameter snapshot
    pub fn valuation_engine(&self) -> Result<ValuationEngine> {
        let params = self.store.system_parameters()?;
        ValuationEngine::for_parameters(&self.config, &params)
    }

    pub fn valuate(&self, loan: &Loan, time: &SafeTimeProvider) -> Result<Valuation> {
        let engine = self.observe("valuate", self.valuation_engine())?;
        Ok(engine.valuate_now(loan, time))
    }

    /// advisory credit check; a denial is a verdict, not an error
    pub fn check_credit_limit(
        &self,
        user_id: UserId,
        candidate: Money,
        exclude: Option<LoanId>,
        time: &SafeTimeProvider,
    ) -> Result<CreditCheck> {
        let result = (|| -> Result<CreditCheck> {
            let engine = self.valuation_engine()?;
            let limit = self
                .store
                .credit_limit(user_id)?
                .unwrap_or(self.config.default_credit_limit);
            let loans = self.store.loans_for_user(user_id)?;
            let others = loans.iter().filter(|l| Some(l.id) != exclude);
            Ok(CreditLimitEvaluator::new(&engine).check(limit, others, candidate, time.now()))
        })();
        self.observe("check_credit_limit", result)
    }

    // loan lifecycle

    pub fn apply_for_loan(
        &self,
        actor: &Actor,
        request: LoanRequest,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        self.record("apply_for_loan", self.lifecycle().apply(actor, request, time))
    }

    pub fn approve_loan(&self, actor: &Actor, loan_id: LoanId, time: &SafeTimeProvider) -> Result<Loan> {
        self.record("approve_loan", self.lifecycle().approve(actor, loan_id, time))
    }

    pub fn reject_loan(
        &self,
        actor: &Actor,
        loan_id: LoanId,
        reason: Option<String>,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        self.record("reject_loan", self.lifecycle().reject(actor, loan_id, reason, time))
    }

    pub fn edit_loan(
        &self,
        actor: &Actor,
        loan_id: LoanId,
        edit: LoanEdit,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        self.record("edit_loan", self.lifecycle().edit(actor, loan_id, edit, time))
    }

    // payments

    pub fn submit_payment(
        &self,
        actor: &Actor,
        loan_id: LoanId,
        amount: Money,
        proof_reference: &str,
        time: &SafeTimeProvider,
    ) -> Result<Payment> {
        let result = self
            .settlement()
            .submit(actor, loan_id, amount, proof_reference, time);
        let (payment, event) = self.observe("submit_payment", result)?;
        self.emit_all(vec![event]);
        Ok(payment)
    }

    pub fn approve_payment(
        &self,
        actor: &Actor,
        payment_id: PaymentId,
        time: &SafeTimeProvider,
    ) -> Result<PaymentReview> {
        let result = self.settlement().approve(actor, payment_id, time);
        let review = self.observe("approve_payment", result)?;
        self.emit_all(review.events.clone());
        Ok(review)
    }

    pub fn reject_payment(
        &self,
        actor: &Actor,
        payment_id: PaymentId,
        time: &SafeTimeProvider,
    ) -> Result<PaymentReview> {
        let result = self.settlement().reject(actor, payment_id, time);
        let review = self.observe("reject_payment", result)?;
        self.emit_all(review.events.clone());
        Ok(review)
    }

    pub fn payments_for_loan(&self, actor: &Actor, loan_id: LoanId) -> Result<Vec<Payment>> {
        let result = (|| -> Result<Vec<Payment>> {
            let loan = self.fetch_loan(loan_id)?;
            if !actor.can_act_for(loan.user_id) {
                return Err(LoanError::AccessDenied);
            }
            self.store.payments_for_loan(loan_id)
        })();
        self.observe("payments_for_loan", result)
    }

    /// every payment the user submitted, across all their loans, newest first
    pub fn payment_history(&self, actor: &Actor, user_id: UserId) -> Result<Vec<Payment>> {
        let result = (|| -> Result<Vec<Payment>> {
            if !actor.can_act_for(user_id) {
                return Err(LoanError::AccessDenied);
            }
            self.store.payments_for_user(user_id)
        })();
        self.observe("payment_history", result)
    }

    /// review queue for admins: pending payments joined to their loans
    pub fn pending_payments(&self, actor: &Actor) -> Result<Vec<QueuedPayment>> {
        let result = (|| -> Result<Vec<QueuedPayment>> {
            Self::require_admin(actor, "list pending payments")?;
            let mut queue = Vec::new();
            for payment in self.store.pending_payments()? {
                let loan = self.store.loan(payment.loan_id)?;
                queue.push(QueuedPayment {
                    loan_amount: loan.as_ref().map(|l| l.principal),
                    loan_status: loan.as_ref().map(|l| l.status),
                    payment,
                });
            }
            Ok(queue)
        })();
        self.observe("pending_payments", result)
    }

    // views

    pub fn loan_view(&self, actor: &Actor, loan_id: LoanId, time: &SafeTimeProvider) -> Result<LoanView> {
        let result = (|| -> Result<LoanView> {
            let loan = self.fetch_loan(loan_id)?;
            if !actor.can_act_for(loan.user_id) {
                return Err(LoanError::AccessDenied);
            }
            let engine = self.valuation_engine()?;
            Ok(loan.view(&engine.valuate_now(&loan, time)))
        })();
        self.observe("loan_view", result)
    }

    /// every loan of the user, newest first, with its current valuation
    pub fn loans_for_user(
        &self,
        actor: &Actor,
        user_id: UserId,
        time: &SafeTimeProvider,
    ) -> Result<Vec<LoanView>> {
        let result = (|| -> Result<Vec<LoanView>> {
            if !actor.can_act_for(user_id) {
                return Err(LoanError::AccessDenied);
            }
            let engine = self.valuation_engine()?;
            let now = time.now();
            Ok(self
                .store
                .loans_for_user(user_id)?
                .iter()
                .map(|loan| loan.view(&engine.valuate(loan, now)))
                .collect())
        })();
        self.observe("loans_for_user", result)
    }

    /// every loan in the book, newest first, valued at `time`
    pub fn all_loans(&self, actor: &Actor, time: &SafeTimeProvider) -> Result<Vec<LoanView>> {
        let result = (|| -> Result<Vec<LoanView>> {
            Self::require_admin(actor, "list all loans")?;
            let engine = self.valuation_engine()?;
            let now = time.now();
            Ok(self
                .store
                .all_loans()?
                .iter()
                .map(|loan| loan.view(&engine.valuate(loan, now)))
                .collect())
        })();
        self.observe("all_loans", result)
    }

    /// loans still carrying a balance, with totals against the credit limit
    pub fn portfolio(&self, actor: &Actor, user_id: UserId, time: &SafeTimeProvider) -> Result<Portfolio> {
        let result = (|| -> Result<Portfolio> {
            if !actor.can_act_for(user_id) {
                return Err(LoanError::AccessDenied);
            }
            let engine = self.valuation_engine()?;
            let now = time.now();
            let credit_limit = self
                .store
                .credit_limit(user_id)?
                .unwrap_or(self.config.default_credit_limit);

            let loans: Vec<LoanView> = self
                .store
                .loans_for_user(user_id)?
                .iter()
                .filter(|loan| loan.counts_toward_exposure() && !loan.status.is_terminal())
                .map(|loan| loan.view(&engine.valuate(loan, now)))
                .collect();
            let total_due: Money = loans.iter().map(|v| v.total_due).sum();
            let overdue_loans = loans.iter().filter(|v| v.is_overdue).count();

            let utilization_rate = if credit_limit.is_positive() {
                Rate::from_decimal(
                    (total_due.as_decimal() / credit_limit.as_decimal()).round_dp(4),
                )
            } else {
                Rate::ZERO
            };

            Ok(Portfolio {
                user_id,
                loans,
                total_due,
                overdue_loans,
                credit_limit,
                available_credit: (credit_limit - total_due).floor_zero(),
                utilization_rate,
            })
        })();
        self.observe("portfolio", result)
    }

    /// read-only pass producing due-soon and penalty notices; never writes
    pub fn scan_due_dates(&self, time: &SafeTimeProvider) -> Result<Vec<Notice>> {
        let result = (|| -> Result<Vec<Notice>> {
            let engine = self.valuation_engine()?;
            let now = time.now();
            let calendar = engine.calendar();
            let tomorrow = calendar.civil_date(now + Duration::days(1));

            let mut notices = Vec::new();
            for loan in self.store.outstanding_loans()? {
                let valuation = engine.valuate(&loan, now);
                let due_on = calendar.civil_date(loan.due_date);
                if due_on == tomorrow {
                    notices.push(Notice::DueSoon {
                        loan_id: loan.id,
                        user_id: loan.user_id,
                        due_on,
                        amount_due: valuation.total_due.to_currency(),
                    });
                } else if valuation.is_overdue() && valuation.penalty_amount.is_positive() {
                    notices.push(Notice::PenaltyAlert {
                        loan_id: loan.id,
                        user_id: loan.user_id,
                        days_overdue: valuation.days_overdue,
                        penalty_amount: valuation.penalty_amount.to_currency(),
                        total_due: valuation.total_due.to_currency(),
                    });
                }
            }
            tracing::info!(notices = notices.len(), "due date scan finished");
            Ok(notices)
        })();
        self.observe("scan_due_dates", result)
    }

    // parameters

    pub fn system_parameters(&self) -> Result<SystemParameters> {
        self.observe("system_parameters", self.store.system_parameters())
    }

    /// replace the lending parameters; existing loans keep their snapshotted rate
    pub fn update_parameters(
        &self,
        actor: &Actor,
        params: SystemParameters,
        time: &SafeTimeProvider,
    ) -> Result<SystemParameters> {
        let result = (|| -> Result<(SystemParameters, SystemParameters)> {
            Self::require_admin(actor, "update system parameters")?;
            params.validate()?;
            let old = self.store.system_parameters()?;
            self.store.store_parameters(params.clone())?;
            tracing::info!(
                interest_rate = %params.interest_rate(),
                penalty_per_10k = %params.penalty_rate_per_10k,
                "system parameters updated"
            );
            Ok((old, params))
        })();
        let (old, new) = self.observe("update_parameters", result)?;
        self.emit_all(vec![Event::ParametersUpdated {
            old,
            new: new.clone(),
            timestamp: time.now(),
        }]);
        Ok(new)
    }

    // ledger

    pub fn ledger_for_user(
        &self,
        actor: &Actor,
        user_id: UserId,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<LedgerTransaction>> {
        let result = (|| -> Result<Vec<LedgerTransaction>> {
            if !actor.can_act_for(user_id) {
                return Err(LoanError::AccessDenied);
            }
            Ok(self
                .store
                .ledger_for_user(user_id)?
                .into_iter()
                .filter(|t| transaction_type.map_or(true, |ty| t.transaction_type == ty))
                .collect())
        })();
        self.observe("ledger_for_user", result)
    }

    pub fn ledger_summary(&self, actor: &Actor, user_id: UserId) -> Result<LedgerSummary> {
        let rows = self.ledger_for_user(actor, user_id, None)?;
        Ok(LedgerSummary::from_transactions(&rows))
    }

    // import

    /// bring legacy rows into the store in one batch; nothing is written if any row is invalid
    pub fn import_legacy(&self, actor: &Actor, rows: Vec<LoanRow>) -> Result<usize> {
        let result = (|| -> Result<usize> {
            Self::require_admin(actor, "import loans")?;
            let loans = rows
                .into_iter()
                .map(|row| row.into_loan(&self.config))
                .collect::<Result<Vec<Loan>>>()?;
            let count = loans.len();
            let batch = loans
                .into_iter()
                .fold(WriteBatch::new(), |batch, loan| batch.put_loan(loan));
            self.store.commit(batch)?;
            tracing::info!(count, "legacy loans imported");
            Ok(count)
        })();
        self.observe("import_legacy", result)
    }
}
