use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::SystemParameters;
use crate::decimal::{Money, Rate};

/// engine for calculating overdue penalties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyEngine {
    /// fraction of principal charged per overdue day
    pub daily_rate: Rate,
}

impl PenaltyEngine {
    pub fn new(daily_rate: Rate) -> Self {
        Self { daily_rate }
    }

    pub fn from_parameters(params: &SystemParameters) -> Self {
        Self::new(params.penalty_rate())
    }

    /// penalty is always charged on the principal, never on the
    /// interest-inclusive balance
    pub fn calculate_penalty(&self, principal: Money, days_overdue: u32) -> PenaltyCalculation {
        let penalty_amount = principal.apply_rate(self.daily_rate) * Decimal::from(days_overdue);
        PenaltyCalculation {
            penalty_amount,
            daily_rate: self.daily_rate,
            days_charged: days_overdue,
            principal_base: principal,
        }
    }
}

/// penalty calculation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyCalculation {
    pub penalty_amount: Money,
    pub daily_rate: Rate,
    pub days_charged: u32,
    pub principal_base: Money,
}
