use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, SystemParameters};
use crate::credit::{CreditCheck, CreditLimitEvaluator};
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::{Event, LedgerTransaction};
use crate::state::{due_date_after, BankDetails, Loan, LoanEdit};
use crate::store::{LoanStore, ParameterSource, UserDirectory, UserLocks, WriteBatch};
use crate::types::{Actor, LoanId, LoanStatus, TransactionType, UserId};
use crate::valuation::{single_period_total, ValuationEngine};

/// a borrower's loan request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub user_id: UserId,
    pub amount: Money,
    pub purpose: String,
    pub comments: Option<String>,
    pub disbursement: Option<BankDetails>,
}

impl LoanRequest {
    pub fn new(user_id: UserId, amount: Money, purpose: impl Into<String>) -> Self {
        Self {
            user_id,
            amount,
            purpose: purpose.into(),
            comments: None,
            disbursement: None,
        }
    }

    pub fn with_disbursement(mut self, details: BankDetails) -> Self {
        self.disbursement = Some(details);
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

/// a committed lifecycle transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub loan: Loan,
    pub ledger: Option<LedgerTransaction>,
    pub events: Vec<Event>,
    /// the credit check the transition passed, when it ran one
    pub credit_check: Option<CreditCheck>,
}

/// check an amount against the parameter snapshot
pub fn validate_amount(amount: Money, params: &SystemParameters) -> Result<()> {
    if !amount.is_positive() {
        return Err(LoanError::InvalidAmount { amount });
    }
    if amount < params.min_loan_amount {
        return Err(LoanError::BelowMinLoanAmount {
            minimum: params.min_loan_amount,
            requested: amount,
        });
    }
    if amount > params.max_loan_amount {
        return Err(LoanError::AboveMaxLoanAmount {
            maximum: params.max_loan_amount,
            requested: amount,
        });
    }
    Ok(())
}

/// fold the single-period interest into the balance, at most once
fn fold_interest(loan: &mut Loan) -> Money {
    if loan.interest_applied {
        return Money::ZERO;
    }
    let total = single_period_total(loan.principal, loan.interest_rate);
    let interest = total - loan.principal;
    loan.outstanding_balance = total;
    loan.interest_applied = true;
    interest
}

/// orchestrates apply, approve, reject and admin edits over a store
pub struct LifecycleController<'a, S> {
    store: &'a S,
    locks: &'a UserLocks,
    config: &'a EngineConfig,
}

impl<'a, S> LifecycleController<'a, S>
where
    S: LoanStore + UserDirectory + ParameterSource,
{
    pub fn new(store: &'a S, locks: &'a UserLocks, config: &'a EngineConfig) -> Self {
        Self {
            store,
            locks,
            config,
        }
    }

    fn credit_limit(&self, user_id: UserId) -> Result<Money> {
        Ok(self
            .store
            .credit_limit(user_id)?
            .unwrap_or(self.config.default_credit_limit))
    }

    fn fetch(&self, loan_id: LoanId) -> Result<Loan> {
        self.store
            .loan(loan_id)?
            .ok_or(LoanError::LoanNotFound { id: loan_id })
    }

    /// run the credit check for `candidate` against the user's loans other than `exclude`
    fn check_credit(
        &self,
        user_id: UserId,
        exclude: Option<LoanId>,
        candidate: Money,
        params: &SystemParameters,
        now: DateTime<Utc>,
    ) -> Result<CreditCheck> {
        let engine = ValuationEngine::for_parameters(self.config, params)?;
        let limit = self.credit_limit(user_id)?;
        let loans = self.store.loans_for_user(user_id)?;
        let others = loans.iter().filter(|l| Some(l.id) != exclude);

        let check = CreditLimitEvaluator::new(&engine).check(limit, others, candidate, now);
        if !check.admitted {
            tracing::warn!(
                user_id = %user_id,
                current_debt = %check.current_debt,
                requested = %check.requested,
                limit = %check.limit,
                "credit limit check denied"
            );
        }
        check.into_result()
    }

    /// create a pending loan for the requesting user (or, for admins, on
    /// their behalf)
    pub fn apply(
        &self,
        actor: &Actor,
        request: LoanRequest,
        time: &SafeTimeProvider,
    ) -> Result<Transition> {
        if !actor.can_act_for(request.user_id) {
            return Err(LoanError::AccessDenied);
        }
        let params = self.store.system_parameters()?;
        validate_amount(request.amount, &params)?;

        self.locks.serialize(request.user_id, || -> Result<Transition> {
            let now = time.now();
            let check = self.check_credit(request.user_id, None, request.amount, &params, now)?;

            let mut loan = Loan::new_application(
                request.user_id,
                request.amount,
                params.interest_rate(),
                now,
                self.config.term_days,
                request.purpose,
            );
            loan.comments = request.comments;
            loan.disbursement = request.disbursement;

            let ledger = LedgerTransaction::record(
                loan.user_id,
                loan.id,
                TransactionType::LoanApplication,
                loan.principal,
                loan.outstanding_balance,
                format!("Loan application of {}", loan.principal),
                now,
            );
            self.store.commit(
                WriteBatch::new()
                    .put_loan(loan.clone())
                    .append_ledger(ledger.clone()),
            )?;

            tracing::info!(
                loan_id = %loan.id,
                user_id = %loan.user_id,
                amount = %loan.principal,
                "loan application recorded"
            );

            let event = Event::LoanApplied {
                loan_id: loan.id,
                user_id: loan.user_id,
                amount: loan.principal,
                interest_rate: loan.interest_rate,
                due_date: loan.due_date,
                submitted_by: actor.user_id,
            };
            Ok(Transition {
                loan,
                ledger: Some(ledger),
                events: vec![event],
                credit_check: Some(check),
            })
        })
    }

    /// approve a pending loan, folding its interest into the balance
    pub fn approve(
        &self,
        actor: &Actor,
        loan_id: LoanId,
        time: &SafeTimeProvider,
    ) -> Result<Transition> {
        if !actor.is_admin() {
            return Err(LoanError::admin_required("approve loans"));
        }
        let user_id = self.fetch(loan_id)?.user_id;

        self.locks.serialize(user_id, || -> Result<Transition> {
            let now = time.now();
            let mut loan = self.fetch(loan_id)?;
            match loan.status {
                LoanStatus::Pending => {}
                LoanStatus::Approved | LoanStatus::Active => return Err(LoanError::AlreadyApproved),
                from @ (LoanStatus::Paid | LoanStatus::Rejected) => {
                    return Err(LoanError::InvalidTransition {
                        from,
                        to: LoanStatus::Approved,
                    })
                }
            }

            let params = self.store.system_parameters()?;
            let check = self.check_credit(user_id, Some(loan.id), loan.principal, &params, now)?;

            let interest = fold_interest(&mut loan);
            loan.approval_date = Some(now);
            loan.update_status(LoanStatus::Approved, now);

            let ledger = LedgerTransaction::record(
                loan.user_id,
                loan.id,
                TransactionType::LoanApproved,
                loan.principal,
                loan.outstanding_balance,
                format!("Loan approved, balance {}", loan.outstanding_balance),
                now,
            );
            self.store.commit(
                WriteBatch::new()
                    .put_loan(loan.clone())
                    .append_ledger(ledger.clone()),
            )?;

            tracing::info!(
                loan_id = %loan.id,
                user_id = %loan.user_id,
                balance = %loan.outstanding_balance,
                "loan approved"
            );

            let event = Event::LoanApproved {
                loan_id: loan.id,
                user_id: loan.user_id,
                principal: loan.principal,
                interest,
                new_balance: loan.outstanding_balance,
                timestamp: now,
            };
            Ok(Transition {
                loan,
                ledger: Some(ledger),
                events: vec![event],
                credit_check: Some(check),
            })
        })
    }

    /// reject a pending loan; the balance is left as it is
    pub fn reject(
        &self,
        actor: &Actor,
        loan_id: LoanId,
        reason: Option<String>,
        time: &SafeTimeProvider,
    ) -> Result<Transition> {
        if !actor.is_admin() {
            return Err(LoanError::admin_required("reject loans"));
        }
        let user_id = self.fetch(loan_id)?.user_id;

        self.locks.serialize(user_id, || -> Result<Transition> {
            let now = time.now();
            let mut loan = self.fetch(loan_id)?;
            if loan.status != LoanStatus::Pending {
                return Err(LoanError::InvalidTransition {
                    from: loan.status,
                    to: LoanStatus::Rejected,
                });
            }

            loan.update_status(LoanStatus::Rejected, now);
            if reason.is_some() {
                loan.comments = reason.clone();
            }
            self.store.commit(WriteBatch::new().put_loan(loan.clone()))?;

            tracing::info!(loan_id = %loan.id, user_id = %loan.user_id, "loan rejected");

            let event = Event::LoanRejected {
                loan_id: loan.id,
                user_id: loan.user_id,
                reason,
                timestamp: now,
            };
            Ok(Transition {
                loan,
                ledger: None,
                events: vec![event],
                credit_check: None,
            })
        })
    }

    /// correct stored fields; moving a loan into approved goes through the
    /// same credit check and one-time interest rule as `approve`
    pub fn edit(
        &self,
        actor: &Actor,
        loan_id: LoanId,
        edit: LoanEdit,
        time: &SafeTimeProvider,
    ) -> Result<Transition> {
        if !actor.is_admin() {
            return Err(LoanError::admin_required("edit loans"));
        }
        let user_id = self.fetch(loan_id)?.user_id;

        self.locks.serialize(user_id, || -> Result<Transition> {
            let now = time.now();
            let current = self.fetch(loan_id)?;
            if edit.is_empty() {
                return Ok(Transition {
                    loan: current,
                    ledger: None,
                    events: Vec::new(),
                    credit_check: None,
                });
            }

            let target = edit.status.unwrap_or(current.status);
            if !current.status.can_transition_to(target) {
                return Err(LoanError::InvalidTransition {
                    from: current.status,
                    to: target,
                });
            }

            let mut loan = current.clone();
            if let Some(principal) = edit.principal {
                if !principal.is_positive() {
                    return Err(LoanError::InvalidAmount { amount: principal });
                }
                loan.principal = principal;
            }
            if let Some(balance) = edit.outstanding_balance {
                if balance.is_negative() {
                    return Err(LoanError::InvalidAmount { amount: balance });
                }
                loan.outstanding_balance = balance;
            }
            if let Some(rate) = edit.interest_rate {
                if rate.is_negative() {
                    return Err(LoanError::InvalidConfiguration {
                        message: "interest rate must not be negative".to_string(),
                    });
                }
                loan.interest_rate = rate;
            }
            if let Some(applied) = edit.application_date {
                loan.application_date = applied;
                loan.due_date = due_date_after(applied, self.config.term_days)?;
            }
            if let Some(approved) = edit.approval_date {
                loan.approval_date = Some(approved);
            }
            if let Some(purpose) = edit.purpose.clone() {
                loan.purpose = purpose;
            }
            if let Some(comments) = edit.comments.clone() {
                loan.comments = Some(comments);
            }

            let mut events = Vec::new();
            let mut ledger = None;
            let mut credit_check = None;

            let newly_approved = target.is_approved() && !current.status.is_approved();
            if newly_approved {
                let params = self.store.system_parameters()?;
                credit_check =
                    Some(self.check_credit(user_id, Some(loan.id), loan.principal, &params, now)?);

                // an explicit balance in the same edit is taken as already
                // carrying interest
                let interest = if edit.outstanding_balance.is_some() {
                    loan.interest_applied = true;
                    Money::ZERO
                } else {
                    fold_interest(&mut loan)
                };
                if loan.approval_date.is_none() {
                    loan.approval_date = Some(now);
                }

                // same row shape as `approve`: principal disbursed, folded balance after
                ledger = Some(LedgerTransaction::record(
                    loan.user_id,
                    loan.id,
                    TransactionType::LoanApproved,
                    loan.principal,
                    loan.outstanding_balance,
                    format!("Loan approved by edit, balance {}", loan.outstanding_balance),
                    now,
                ));
                events.push(Event::LoanApproved {
                    loan_id: loan.id,
                    user_id: loan.user_id,
                    principal: loan.principal,
                    interest,
                    new_balance: loan.outstanding_balance,
                    timestamp: now,
                });
            }
            loan.update_status(target, now);

            let mut batch = WriteBatch::new().put_loan(loan.clone());
            if let Some(entry) = ledger.clone() {
                batch = batch.append_ledger(entry);
            }
            self.store.commit(batch)?;

            let fields = edit.touched_fields();
            tracing::info!(
                loan_id = %loan.id,
                fields = ?fields,
                status = %loan.status,
                "loan edited"
            );

            events.insert(
                0,
                Event::LoanEdited {
                    loan_id: loan.id,
                    fields,
                    old_status: current.status,
                    new_status: loan.status,
                    timestamp: now,
                },
            );
            Ok(Transition {
                loan,
                ledger,
                events,
                credit_check,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::store::InMemoryStore;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn params() -> SystemParameters {
        SystemParameters::new(
            dec!(5),
            dec!(1300),
            Money::from_major(1_000),
            Money::from_major(50_000),
        )
    }

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    struct Fixture {
        store: InMemoryStore,
        locks: UserLocks,
        config: EngineConfig,
        admin: Actor,
        borrower: Actor,
    }

    impl Fixture {
        fn new(limit: i64) -> Self {
            let store = InMemoryStore::with_parameters(params());
            let borrower = Actor::borrower(Uuid::new_v4());
            store.set_credit_limit(borrower.user_id, Money::from_major(limit));
            Self {
                store,
                locks: UserLocks::new(),
                config: EngineConfig::standard(),
                admin: Actor::admin(Uuid::new_v4()),
                borrower,
            }
        }

        fn controller(&self) -> LifecycleController<'_, InMemoryStore> {
            LifecycleController::new(&self.store, &self.locks, &self.config)
        }

        fn request(&self, amount: i64) -> LoanRequest {
            LoanRequest::new(self.borrower.user_id, Money::from_major(amount), "stock")
        }
    }

    #[test]
    fn test_amount_validation() {
        let p = params();
        assert!(matches!(
            validate_amount(Money::ZERO, &p),
            Err(LoanError::InvalidAmount { .. })
        ));
        assert!(matches!(
            validate_amount(Money::from_major(500), &p),
            Err(LoanError::BelowMinLoanAmount { .. })
        ));
        assert!(matches!(
            validate_amount(Money::from_major(50_001), &p),
            Err(LoanError::AboveMaxLoanAmount { .. })
        ));
        assert!(validate_amount(Money::from_major(50_000), &p).is_ok());
    }

    #[test]
    fn test_apply_creates_pending_loan() {
        let fx = Fixture::new(30_000);
        let time = time();

        let t = fx.controller().apply(&fx.borrower, fx.request(20_000), &time).unwrap();

        assert_eq!(t.loan.status, LoanStatus::Pending);
        assert_eq!(t.loan.outstanding_balance, Money::from_major(20_000));
        assert_eq!(t.loan.interest_rate, Rate::from_percentage(5));
        assert_eq!(t.loan.due_date, time.now() + Duration::days(28));
        let ledger = t.ledger.unwrap();
        assert_eq!(ledger.transaction_type, TransactionType::LoanApplication);
        assert_eq!(fx.store.ledger_for_user(fx.borrower.user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_apply_for_someone_else_is_denied() {
        let fx = Fixture::new(30_000);
        let stranger = Actor::borrower(Uuid::new_v4());

        let result = fx.controller().apply(&stranger, fx.request(2_000), &time());
        assert_eq!(result.unwrap_err(), LoanError::AccessDenied);

        // admins may apply on a borrower's behalf
        assert!(fx.controller().apply(&fx.admin, fx.request(2_000), &time()).is_ok());
    }

    #[test]
    fn test_apply_over_limit_writes_nothing() {
        let fx = Fixture::new(10_000);
        let result = fx.controller().apply(&fx.borrower, fx.request(10_001), &time());

        assert!(matches!(result, Err(LoanError::CreditLimitExceeded { .. })));
        assert_eq!(fx.store.loan_count(), 0);
        assert!(fx.store.ledger().unwrap().is_empty());
    }

    #[test]
    fn test_approve_folds_interest_once() {
        let fx = Fixture::new(30_000);
        let time = time();
        let applied = fx.controller().apply(&fx.borrower, fx.request(20_000), &time).unwrap();

        let approved = fx.controller().approve(&fx.admin, applied.loan.id, &time).unwrap();
        assert_eq!(approved.loan.outstanding_balance, Money::from_major(21_000));
        assert_eq!(approved.loan.status, LoanStatus::Approved);
        assert!(approved.loan.interest_applied);
        assert_eq!(approved.loan.approval_date, Some(time.now()));

        let again = fx.controller().approve(&fx.admin, applied.loan.id, &time);
        assert_eq!(again.unwrap_err(), LoanError::AlreadyApproved);
        let stored = fx.store.loan(applied.loan.id).unwrap().unwrap();
        assert_eq!(stored.outstanding_balance, Money::from_major(21_000));
    }

    #[test]
    fn test_borrower_cannot_approve() {
        let fx = Fixture::new(30_000);
        let applied = fx.controller().apply(&fx.borrower, fx.request(2_000), &time()).unwrap();

        let result = fx.controller().approve(&fx.borrower, applied.loan.id, &time());
        assert!(matches!(result, Err(LoanError::AdminRequired { .. })));
    }

    #[test]
    fn test_approve_missing_loan() {
        let fx = Fixture::new(30_000);
        let id = Uuid::new_v4();
        assert_eq!(
            fx.controller().approve(&fx.admin, id, &time()).unwrap_err(),
            LoanError::LoanNotFound { id }
        );
    }

    #[test]
    fn test_reject_is_terminal() {
        let fx = Fixture::new(30_000);
        let time = time();
        let applied = fx.controller().apply(&fx.borrower, fx.request(2_000), &time).unwrap();

        let rejected = fx
            .controller()
            .reject(&fx.admin, applied.loan.id, Some("incomplete".to_string()), &time)
            .unwrap();
        assert_eq!(rejected.loan.status, LoanStatus::Rejected);
        assert_eq!(rejected.loan.outstanding_balance, Money::from_major(2_000));

        let approve = fx.controller().approve(&fx.admin, applied.loan.id, &time);
        assert_eq!(
            approve.unwrap_err(),
            LoanError::InvalidTransition {
                from: LoanStatus::Rejected,
                to: LoanStatus::Approved
            }
        );
    }

    #[test]
    fn test_edit_into_approved_applies_interest_once() {
        let fx = Fixture::new(30_000);
        let time = time();
        let applied = fx.controller().apply(&fx.borrower, fx.request(10_000), &time).unwrap();

        let edit = LoanEdit {
            status: Some(LoanStatus::Active),
            ..LoanEdit::default()
        };
        let t = fx.controller().edit(&fx.admin, applied.loan.id, edit, &time).unwrap();
        assert_eq!(t.loan.status, LoanStatus::Active);
        assert_eq!(t.loan.outstanding_balance, Money::from_major(10_500));
        assert!(t.ledger.is_some());

        // later edits of principal do not re-apply interest
        let edit = LoanEdit {
            principal: Some(Money::from_major(12_000)),
            status: Some(LoanStatus::Approved),
            ..LoanEdit::default()
        };
        let t = fx.controller().edit(&fx.admin, applied.loan.id, edit, &time).unwrap();
        assert_eq!(t.loan.outstanding_balance, Money::from_major(10_500));
        assert!(t.ledger.is_none());
    }

    #[test]
    fn test_edit_respects_state_machine() {
        let fx = Fixture::new(30_000);
        let time = time();
        let applied = fx.controller().apply(&fx.borrower, fx.request(2_000), &time).unwrap();
        fx.controller()
            .reject(&fx.admin, applied.loan.id, None, &time)
            .unwrap();

        let edit = LoanEdit {
            status: Some(LoanStatus::Approved),
            ..LoanEdit::default()
        };
        assert!(matches!(
            fx.controller().edit(&fx.admin, applied.loan.id, edit, &time),
            Err(LoanError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_edit_application_date_moves_due_date() {
        let fx = Fixture::new(30_000);
        let time = time();
        let applied = fx.controller().apply(&fx.borrower, fx.request(2_000), &time).unwrap();
        let new_date = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let edit = LoanEdit {
            application_date: Some(new_date),
            outstanding_balance: Some(Money::from_major(-1)),
            ..LoanEdit::default()
        };
        assert!(fx.controller().edit(&fx.admin, applied.loan.id, edit, &time).is_err());

        let edit = LoanEdit {
            application_date: Some(new_date),
            ..LoanEdit::default()
        };
        let t = fx.controller().edit(&fx.admin, applied.loan.id, edit, &time).unwrap();
        assert_eq!(t.loan.due_date, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_edit_into_approved_with_balance_keeps_it() {
        let fx = Fixture::new(30_000);
        let time = time();
        let applied = fx.controller().apply(&fx.borrower, fx.request(10_000), &time).unwrap();

        let edit = LoanEdit {
            status: Some(LoanStatus::Approved),
            outstanding_balance: Some(Money::from_major(10_500)),
            ..LoanEdit::default()
        };
        let t = fx.controller().edit(&fx.admin, applied.loan.id, edit, &time).unwrap();

        assert_eq!(t.loan.status, LoanStatus::Approved);
        assert_eq!(t.loan.outstanding_balance, Money::from_major(10_500));
        assert!(t.loan.interest_applied);
        assert_eq!(t.loan.approval_date, Some(time.now()));
        assert!(t.credit_check.unwrap().admitted);

        let ledger = t.ledger.unwrap();
        assert_eq!(ledger.transaction_type, TransactionType::LoanApproved);
        assert_eq!(ledger.amount, Money::from_major(10_000));
        assert_eq!(ledger.balance_after, Money::from_major(10_500));
        assert!(t.events.iter().any(|e| matches!(
            e,
            Event::LoanApproved { interest, .. } if *interest == Money::ZERO
        )));

        // a plain approve afterwards cannot fold interest a second time
        assert_eq!(
            fx.controller().approve(&fx.admin, applied.loan.id, &time).unwrap_err(),
            LoanError::AlreadyApproved
        );
        let stored = fx.store.loan(applied.loan.id).unwrap().unwrap();
        assert_eq!(stored.outstanding_balance, Money::from_major(10_500));
    }

    #[test]
    fn test_edit_into_approved_runs_credit_check() {
        let fx = Fixture::new(30_000);
        let time = time();
        let first = fx.controller().apply(&fx.borrower, fx.request(20_000), &time).unwrap();
        fx.controller().apply(&fx.borrower, fx.request(10_000), &time).unwrap();

        // the edited principal is checked against the other loan's 10,000
        let edit = LoanEdit {
            status: Some(LoanStatus::Approved),
            principal: Some(Money::from_major(25_000)),
            ..LoanEdit::default()
        };
        let err = fx
            .controller()
            .edit(&fx.admin, first.loan.id, edit, &time)
            .unwrap_err();
        match err {
            LoanError::CreditLimitExceeded {
                current_debt,
                projected_total,
                available,
                ..
            } => {
                assert_eq!(current_debt, Money::from_major(10_000));
                assert_eq!(projected_total, Money::from_major(35_000));
                assert_eq!(available, Money::from_major(20_000));
            }
            other => panic!("expected credit denial, got {:?}", other),
        }

        let stored = fx.store.loan(first.loan.id).unwrap().unwrap();
        assert_eq!(stored.status, LoanStatus::Pending);
        assert_eq!(stored.principal, Money::from_major(20_000));
        assert_eq!(fx.store.ledger().unwrap().len(), 2);
    }

    #[test]
    fn test_edit_application_date_out_of_range() {
        let fx = Fixture::new(30_000);
        let time = time();
        let applied = fx.controller().apply(&fx.borrower, fx.request(2_000), &time).unwrap();

        let edit = LoanEdit {
            application_date: Some(DateTime::<Utc>::MAX_UTC),
            ..LoanEdit::default()
        };
        assert!(matches!(
            fx.controller().edit(&fx.admin, applied.loan.id, edit, &time),
            Err(LoanError::InvalidRecord { .. })
        ));
        let stored = fx.store.loan(applied.loan.id).unwrap().unwrap();
        assert_eq!(stored.due_date, applied.loan.due_date);
    }
}
