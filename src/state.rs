use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::decimal::{parse_lenient, Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::{LoanId, LoanStatus, PaymentId, PaymentStatus, UserId};
use crate::valuation::{single_period_total, Valuation};

/// bank account the principal is disbursed to; not used in any calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_code: String,
}

/// persisted loan record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    // identification
    pub id: LoanId,
    pub user_id: UserId,

    // money
    pub principal: Money,
    /// snapshot of the system rate at application time
    pub interest_rate: Rate,
    pub outstanding_balance: Money,
    /// set once the single-period interest is folded into the balance
    #[serde(default)]
    pub interest_applied: bool,

    // status
    pub status: LoanStatus,
    pub last_status_change: DateTime<Utc>,

    // dates
    pub application_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub due_date: DateTime<Utc>,
    pub last_payment_date: Option<DateTime<Utc>>,

    // metadata
    pub purpose: String,
    pub comments: Option<String>,
    pub disbursement: Option<BankDetails>,
}

impl Loan {
    /// create a pending loan; the due date is fixed from the application date
    pub fn new_application(
        user_id: UserId,
        principal: Money,
        interest_rate: Rate,
        application_date: DateTime<Utc>,
        term_days: u32,
        purpose: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            principal,
            interest_rate,
            outstanding_balance: principal,
            interest_applied: false,
            status: LoanStatus::Pending,
            last_status_change: application_date,
            application_date,
            approval_date: None,
            due_date: application_date + Duration::days(term_days as i64),
            last_payment_date: None,
            purpose,
            comments: None,
            disbursement: None,
        }
    }

    /// amount owed at the due date if nothing goes overdue
    pub fn quoted_repayment(&self) -> Money {
        single_period_total(self.principal, self.interest_rate)
    }

    /// loans that count toward a user's credit exposure
    pub fn counts_toward_exposure(&self) -> bool {
        self.status != LoanStatus::Rejected && self.outstanding_balance.is_positive()
    }

    /// loans a payment can be submitted for; interest must already be folded
    /// so a later approval never resets a reduced balance
    pub fn accepts_payments(&self) -> bool {
        self.status.is_approved()
    }

    pub fn update_status(&mut self, status: LoanStatus, timestamp: DateTime<Utc>) {
        if self.status != status {
            self.status = status;
            self.last_status_change = timestamp;
        }
    }

    /// serializable view combining the record with a valuation
    pub fn view(&self, valuation: &Valuation) -> LoanView {
        LoanView {
            id: self.id,
            user_id: self.user_id,
            status: self.status,
            purpose: self.purpose.clone(),
            principal: self.principal.to_currency(),
            interest_rate: self.interest_rate,
            stored_balance: self.outstanding_balance.to_currency(),
            quoted_repayment: self.quoted_repayment().to_currency(),
            application_date: self.application_date,
            approval_date: self.approval_date,
            due_date: self.due_date,
            last_payment_date: self.last_payment_date,
            interest_accrued: valuation.interest_accrued.to_currency(),
            days_overdue: valuation.days_overdue,
            penalty_amount: valuation.penalty_amount.to_currency(),
            total_due: valuation.total_due.to_currency(),
            is_overdue: valuation.is_overdue(),
        }
    }
}

/// submitted proof-of-payment awaiting review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub amount: Money,
    /// reference to the uploaded screenshot
    pub proof_reference: String,
    pub status: PaymentStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn submit(
        loan: &Loan,
        amount: Money,
        proof_reference: String,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id: loan.id,
            user_id: loan.user_id,
            amount,
            proof_reference,
            status: PaymentStatus::Pending,
            submitted_at,
            reviewed_at: None,
        }
    }

    pub fn review(&mut self, status: PaymentStatus, timestamp: DateTime<Utc>) {
        self.status = status;
        self.reviewed_at = Some(timestamp);
    }
}

/// admin correction of stored loan fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanEdit {
    pub principal: Option<Money>,
    pub outstanding_balance: Option<Money>,
    pub interest_rate: Option<Rate>,
    pub status: Option<LoanStatus>,
    /// moves the due date with it
    pub application_date: Option<DateTime<Utc>>,
    pub approval_date: Option<DateTime<Utc>>,
    pub purpose: Option<String>,
    pub comments: Option<String>,
}

impl LoanEdit {
    pub fn is_empty(&self) -> bool {
        *self == LoanEdit::default()
    }

    /// names of the fields this edit touches
    pub fn touched_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.principal.is_some() {
            fields.push("principal");
        }
        if self.outstanding_balance.is_some() {
            fields.push("outstanding_balance");
        }
        if self.interest_rate.is_some() {
            fields.push("interest_rate");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.application_date.is_some() {
            fields.push("application_date");
        }
        if self.approval_date.is_some() {
            fields.push("approval_date");
        }
        if self.purpose.is_some() {
            fields.push("purpose");
        }
        if self.comments.is_some() {
            fields.push("comments");
        }
        fields.into_iter().map(String::from).collect()
    }
}

/// loan as found in a legacy table: numbers and dates as raw text, no
/// interest flag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanRow {
    pub id: String,
    pub user_id: String,
    pub loan_amount: String,
    pub interest_rate: String,
    pub outstanding_balance: String,
    pub loan_status: String,
    pub application_date: String,
    pub approval_date: Option<String>,
    pub last_payment_date: Option<String>,
    pub loan_purpose: Option<String>,
    pub comments: Option<String>,
    pub interest_applied: Option<bool>,
}

impl LoanRow {
    /// convert to a loan, coercing unparseable numbers to zero
    pub fn into_loan(self, config: &EngineConfig) -> Result<Loan> {
        let id = parse_uuid("id", &self.id)?;
        let user_id = parse_uuid("user_id", &self.user_id)?;
        let status: LoanStatus = self
            .loan_status
            .parse()
            .map_err(|message| LoanError::InvalidRecord { message })?;
        let application_date = parse_timestamp("application_date", &self.application_date)?;
        let approval_date = self
            .approval_date
            .as_deref()
            .map(|s| parse_timestamp("approval_date", s))
            .transpose()?;
        let last_payment_date = self
            .last_payment_date
            .as_deref()
            .map(|s| parse_timestamp("last_payment_date", s))
            .transpose()?;

        let principal = Money::parse_lenient(&self.loan_amount);
        let outstanding_balance = Money::parse_lenient(&self.outstanding_balance).floor_zero();
        let interest_rate = Rate::from_lenient(parse_lenient(&self.interest_rate));

        // rows written before the flag existed: an approved balance still equal
        // to the principal has not had interest folded in
        let interest_applied = self.interest_applied.unwrap_or_else(|| match status {
            LoanStatus::Approved | LoanStatus::Active => {
                (outstanding_balance - principal).abs() >= config.legacy_interest_epsilon
            }
            LoanStatus::Paid => true,
            LoanStatus::Pending | LoanStatus::Rejected => false,
        });

        Ok(Loan {
            id,
            user_id,
            principal,
            interest_rate,
            outstanding_balance,
            interest_applied,
            status,
            last_status_change: approval_date.unwrap_or(application_date),
            application_date,
            approval_date,
            due_date: application_date + Duration::days(config.term_days as i64),
            last_payment_date,
            purpose: self.loan_purpose.unwrap_or_default(),
            comments: self.comments,
            disbursement: None,
        })
    }
}

/// due date for a loan applied for at `application_date`
pub fn due_date_after(application_date: DateTime<Utc>, term_days: u32) -> Result<DateTime<Utc>> {
    application_date
        .checked_add_signed(Duration::days(term_days as i64))
        .ok_or_else(|| LoanError::InvalidRecord {
            message: format!("no due date {} days after {}", term_days, application_date),
        })
}

fn parse_uuid(field: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|e| LoanError::InvalidRecord {
        message: format!("{}: {}", field, e),
    })
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LoanError::InvalidRecord {
            message: format!("{}: {}", field, e),
        })
}

/// serializable view of a loan and its current valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub user_id: UserId,
    pub status: LoanStatus,
    pub purpose: String,
    pub principal: Money,
    pub interest_rate: Rate,
    pub stored_balance: Money,
    pub quoted_repayment: Money,
    pub application_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub due_date: DateTime<Utc>,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub interest_accrued: Money,
    pub days_overdue: u32,
    pub penalty_amount: Money,
    pub total_due: Money,
    pub is_overdue: bool,
}

impl LoanView {
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
