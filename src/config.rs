use chrono::FixedOffset;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};

/// longest loan term a config may set
pub const MAX_TERM_DAYS: u32 = 3650;

/// engine-wide settings that do not change at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// days from application to due date
    pub term_days: u32,
    /// credit limit used for users without one
    pub default_credit_limit: Money,
    /// utc offset of the civil calendar used for overdue day counting
    pub reference_offset_minutes: i32,
    /// tolerance when inferring whether a legacy row already carries interest
    pub legacy_interest_epsilon: Money,
}

impl EngineConfig {
    /// 28-day term, 10,000 fallback limit, India Standard Time
    pub fn standard() -> Self {
        Self {
            term_days: 28,
            default_credit_limit: Money::from_major(10_000),
            reference_offset_minutes: 330,
            legacy_interest_epsilon: Money::ONE,
        }
    }

    /// same settings with another reference calendar
    pub fn with_reference_offset(mut self, minutes: i32) -> Self {
        self.reference_offset_minutes = minutes;
        self
    }

    pub fn reference_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.reference_offset_minutes * 60).ok_or_else(|| {
            LoanError::InvalidConfiguration {
                message: format!(
                    "reference offset of {} minutes is out of range",
                    self.reference_offset_minutes
                ),
            }
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.term_days == 0 {
            return Err(LoanError::InvalidConfiguration {
                message: "term must be at least one day".to_string(),
            });
        }
        if self.term_days > MAX_TERM_DAYS {
            return Err(LoanError::InvalidConfiguration {
                message: format!("term must not exceed {} days", MAX_TERM_DAYS),
            });
        }
        if !self.default_credit_limit.is_positive() {
            return Err(LoanError::InvalidConfiguration {
                message: "default credit limit must be positive".to_string(),
            });
        }
        if self.legacy_interest_epsilon.is_negative() {
            return Err(LoanError::InvalidConfiguration {
                message: "legacy interest epsilon must not be negative".to_string(),
            });
        }
        self.reference_offset()?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| LoanError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// admin-maintained lending parameters, read as a snapshot per operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemParameters {
    /// single-period interest as a percentage (6.8 means 6.8%)
    pub interest_rate_percent: Decimal,
    /// penalty per 10,000 of principal per overdue day
    pub penalty_rate_per_10k: Decimal,
    pub min_loan_amount: Money,
    pub max_loan_amount: Money,
}

impl SystemParameters {
    pub fn new(
        interest_rate_percent: Decimal,
        penalty_rate_per_10k: Decimal,
        min_loan_amount: Money,
        max_loan_amount: Money,
    ) -> Self {
        Self {
            interest_rate_percent,
            penalty_rate_per_10k,
            min_loan_amount,
            max_loan_amount,
        }
    }

    pub fn interest_rate(&self) -> Rate {
        Rate::from_percent(self.interest_rate_percent)
    }

    /// daily penalty rate applied to principal
    pub fn penalty_rate(&self) -> Rate {
        Rate::from_per_10k(self.penalty_rate_per_10k)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interest_rate_percent < Decimal::ZERO || self.interest_rate_percent > dec!(100) {
            return Err(LoanError::InvalidConfiguration {
                message: "interest rate must be between 0 and 100".to_string(),
            });
        }
        if self.penalty_rate_per_10k < Decimal::ZERO {
            return Err(LoanError::InvalidConfiguration {
                message: "penalty rate must not be negative".to_string(),
            });
        }
        if self.max_loan_amount < Money::from_major(1_000) {
            return Err(LoanError::InvalidConfiguration {
                message: "max loan amount must be at least 1000".to_string(),
            });
        }
        if self.min_loan_amount.is_negative() {
            return Err(LoanError::InvalidConfiguration {
                message: "min loan amount must not be negative".to_string(),
            });
        }
        if self.min_loan_amount > self.max_loan_amount {
            return Err(LoanError::InvalidConfiguration {
                message: "min loan amount must not exceed max loan amount".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            interest_rate_percent: dec!(6.8),
            penalty_rate_per_10k: dec!(1300),
            min_loan_amount: Money::from_major(1_000),
            max_loan_amount: Money::from_major(1_000_000),
        }
    }
}
