pub mod interest;
pub mod overdue;
pub mod penalty;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, SystemParameters};
use crate::decimal::Money;
use crate::errors::Result;
use crate::state::Loan;

pub use interest::{pending_interest, single_period_interest, single_period_total};
pub use overdue::ReferenceCalendar;
pub use penalty::{PenaltyCalculation, PenaltyEngine};

/// point-in-time view of what a loan owes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    /// interest owed but not yet written into the stored balance
    pub interest_accrued: Money,
    /// stored balance plus `interest_accrued`
    pub current_balance: Money,
    pub days_overdue: u32,
    pub penalty_amount: Money,
    /// `current_balance + penalty_amount`
    pub total_due: Money,
}

impl Valuation {
    pub fn is_overdue(&self) -> bool {
        self.days_overdue > 0
    }
}

/// computes valuations from a loan record and an instant; never mutates the loan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationEngine {
    calendar: ReferenceCalendar,
    penalty: PenaltyEngine,
}

impl ValuationEngine {
    pub fn new(calendar: ReferenceCalendar, penalty: PenaltyEngine) -> Self {
        Self { calendar, penalty }
    }

    /// engine for one parameter snapshot
    pub fn for_parameters(config: &EngineConfig, params: &SystemParameters) -> Result<Self> {
        Ok(Self::new(
            ReferenceCalendar::from_config(config)?,
            PenaltyEngine::from_parameters(params),
        ))
    }

    pub fn calendar(&self) -> &ReferenceCalendar {
        &self.calendar
    }

    pub fn valuate(&self, loan: &Loan, now: DateTime<Utc>) -> Valuation {
        let interest_accrued = pending_interest(loan);
        let current_balance = loan.outstanding_balance + interest_accrued;

        let days_overdue = if loan.outstanding_balance.is_positive() {
            self.calendar.days_past(loan.due_date, now)
        } else {
            0
        };
        let penalty_amount = self
            .penalty
            .calculate_penalty(loan.principal, days_overdue)
            .penalty_amount;

        Valuation {
            interest_accrued,
            current_balance,
            days_overdue,
            penalty_amount,
            total_due: current_balance + penalty_amount,
        }
    }

    pub fn valuate_now(&self, loan: &Loan, time: &SafeTimeProvider) -> Valuation {
        self.valuate(loan, time.now())
    }
}
