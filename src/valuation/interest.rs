use crate::decimal::{Money, Rate};
use crate::state::Loan;

/// interest owed for the single period of a loan
pub fn single_period_interest(principal: Money, rate: Rate) -> Money {
    principal.apply_rate(rate)
}

/// principal plus its single-period interest
pub fn single_period_total(principal: Money, rate: Rate) -> Money {
    principal + single_period_interest(principal, rate)
}

/// interest that is owed but not yet folded into the stored balance.
///
/// Only approved or active loans owe interest, and only until approval has
/// written it into the balance.
pub fn pending_interest(loan: &Loan) -> Money {
    if loan.status.is_approved() && !loan.interest_applied {
        single_period_interest(loan.principal, loan.interest_rate)
    } else {
        Money::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LoanStatus;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn loan(status: LoanStatus, interest_applied: bool) -> Loan {
        let mut loan = Loan::new_application(
            Uuid::new_v4(),
            Money::from_major(20_000),
            Rate::from_percentage(5),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            28,
            String::new(),
        );
        loan.status = status;
        loan.interest_applied = interest_applied;
        loan
    }

    #[test]
    fn test_single_period() {
        let principal = Money::from_major(20_000);
        let rate = Rate::from_percent(dec!(6.8));
        assert_eq!(single_period_interest(principal, rate), Money::from_major(1_360));
        assert_eq!(single_period_total(principal, rate), Money::from_major(21_360));
    }

    #[test]
    fn test_pending_interest_only_before_folding() {
        assert_eq!(
            pending_interest(&loan(LoanStatus::Approved, false)),
            Money::from_major(1_000)
        );
        assert_eq!(
            pending_interest(&loan(LoanStatus::Active, false)),
            Money::from_major(1_000)
        );
        assert_eq!(pending_interest(&loan(LoanStatus::Approved, true)), Money::ZERO);
        assert_eq!(pending_interest(&loan(LoanStatus::Pending, false)), Money::ZERO);
        assert_eq!(pending_interest(&loan(LoanStatus::Paid, false)), Money::ZERO);
    }
}
