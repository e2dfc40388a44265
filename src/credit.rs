use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::state::Loan;
use crate::valuation::ValuationEngine;

/// outcome of a credit limit check; advisory only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCheck {
    pub admitted: bool,
    /// total due across the counted loans
    pub current_debt: Money,
    pub requested: Money,
    pub projected_total: Money,
    pub limit: Money,
    /// `limit - current_debt`, may be negative when already over the limit
    pub headroom: Money,
    pub loans_counted: usize,
}

impl CreditCheck {
    /// turn a denial into a policy error carrying the figures
    pub fn into_result(self) -> Result<CreditCheck> {
        if self.admitted {
            Ok(self)
        } else {
            Err(LoanError::CreditLimitExceeded {
                current_debt: self.current_debt.to_currency(),
                requested: self.requested.to_currency(),
                projected_total: self.projected_total.to_currency(),
                limit: self.limit.to_currency(),
                available: self.headroom.to_currency(),
            })
        }
    }
}

/// compares a user's exposure plus a candidate principal against their limit
#[derive(Debug, Clone, Copy)]
pub struct CreditLimitEvaluator<'a> {
    valuation: &'a ValuationEngine,
}

impl<'a> CreditLimitEvaluator<'a> {
    pub fn new(valuation: &'a ValuationEngine) -> Self {
        Self { valuation }
    }

    /// total due across loans that count toward exposure
    pub fn exposure<'l>(
        &self,
        loans: impl IntoIterator<Item = &'l Loan>,
        now: DateTime<Utc>,
    ) -> (Money, usize) {
        loans
            .into_iter()
            .filter(|loan| loan.counts_toward_exposure())
            .fold((Money::ZERO, 0), |(sum, count), loan| {
                (sum + self.valuation.valuate(loan, now).total_due, count + 1)
            })
    }

    /// the limit is inclusive: a projected total equal to it is admitted
    pub fn check<'l>(
        &self,
        limit: Money,
        other_loans: impl IntoIterator<Item = &'l Loan>,
        candidate: Money,
        now: DateTime<Utc>,
    ) -> CreditCheck {
        let (current_debt, loans_counted) = self.exposure(other_loans, now);
        let projected_total = current_debt + candidate;

        CreditCheck {
            admitted: projected_total <= limit,
            current_debt,
            requested: candidate,
            projected_total,
            limit,
            headroom: limit - current_debt,
            loans_counted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, SystemParameters};
    use crate::decimal::Rate;
    use crate::types::LoanStatus;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn engine() -> ValuationEngine {
        ValuationEngine::for_parameters(&EngineConfig::standard(), &SystemParameters::default())
            .unwrap()
    }

    fn loan(status: LoanStatus, balance: i64) -> Loan {
        let mut loan = Loan::new_application(
            Uuid::new_v4(),
            Money::from_major(balance),
            Rate::from_percentage(5),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            28,
            String::new(),
        );
        loan.status = status;
        loan.interest_applied = status.is_approved();
        loan
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_denial_reports_headroom() {
        let engine = engine();
        let evaluator = CreditLimitEvaluator::new(&engine);
        let existing = vec![loan(LoanStatus::Approved, 8_000)];

        let check = evaluator.check(Money::from_major(10_000), &existing, Money::from_major(3_000), now());
        assert!(!check.admitted);
        assert_eq!(check.current_debt, Money::from_major(8_000));
        assert_eq!(check.headroom, Money::from_major(2_000));

        match check.into_result() {
            Err(LoanError::CreditLimitExceeded { available, projected_total, .. }) => {
                assert_eq!(available, Money::from_major(2_000));
                assert_eq!(projected_total, Money::from_major(11_000));
            }
            other => panic!("expected credit limit denial, got {:?}", other),
        }
    }

    #[test]
    fn test_limit_is_inclusive() {
        let engine = engine();
        let evaluator = CreditLimitEvaluator::new(&engine);
        let existing = vec![loan(LoanStatus::Approved, 8_000)];

        let check = evaluator.check(Money::from_major(10_000), &existing, Money::from_major(2_000), now());
        assert!(check.admitted);
        assert!(check.into_result().is_ok());
    }

    #[test]
    fn test_rejected_and_settled_loans_are_ignored() {
        let engine = engine();
        let evaluator = CreditLimitEvaluator::new(&engine);
        let mut settled = loan(LoanStatus::Paid, 5_000);
        settled.outstanding_balance = Money::ZERO;
        let existing = vec![loan(LoanStatus::Rejected, 9_000), settled, loan(LoanStatus::Pending, 1_000)];

        let (debt, counted) = evaluator.exposure(&existing, now());
        assert_eq!(debt, Money::from_major(1_000));
        assert_eq!(counted, 1);
    }

    #[test]
    fn test_penalty_counts_toward_exposure() {
        let engine = engine();
        let evaluator = CreditLimitEvaluator::new(&engine);
        let existing = vec![loan(LoanStatus::Approved, 4_000)];
        let overdue = existing[0].due_date + Duration::days(1);

        // 4000 balance plus 520 penalty
        let check = evaluator.check(Money::from_major(10_000), &existing, Money::from_major(5_500), overdue);
        assert_eq!(check.current_debt, Money::from_major(4_520));
        assert!(!check.admitted);
    }
}
