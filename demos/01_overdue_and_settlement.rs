/// overdue and settlement - penalty accrual under controlled time, then repayment
use chrono::{Duration, TimeZone, Utc};
use microloan_engine::{
    Actor, EngineConfig, InMemoryStore, LoanDesk, LoanRequest, Money, Notice, SafeTimeProvider,
    SystemParameters, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== overdue and settlement example ===\n");

    let params = SystemParameters::new(
        dec!(5),
        dec!(1300),
        Money::from_major(1_000),
        Money::from_major(100_000),
    );
    let store = InMemoryStore::with_parameters(params);
    let borrower = Actor::borrower(Uuid::new_v4());
    let admin = Actor::admin(Uuid::new_v4());
    store.set_credit_limit(borrower.user_id, Money::from_major(50_000));
    let desk = LoanDesk::new(store, EngineConfig::standard())?;

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let loan = desk.apply_for_loan(
        &borrower,
        LoanRequest::new(borrower.user_id, Money::from_major(20_000), "school fees"),
        &time,
    )?;
    let loan = desk.approve_loan(&admin, loan.id, &time)?;
    println!("approved on {}: balance {}", time.now().format("%Y-%m-%d"), loan.outstanding_balance);

    // the day before the due date the scan sends a reminder
    controller.advance(Duration::days(27));
    for notice in desk.scan_due_dates(&time)? {
        if let Notice::DueSoon { due_on, amount_due, .. } = notice {
            println!("reminder: {} due on {}", amount_due, due_on);
        }
    }

    // three days late
    controller.advance(Duration::days(4));
    let valuation = desk.valuate(&loan, &time)?;
    println!(
        "\n{}: {} days overdue, penalty {}, total due {}",
        time.now().format("%Y-%m-%d"),
        valuation.days_overdue,
        valuation.penalty_amount,
        valuation.total_due
    );

    // the borrower pays the stored balance; penalty stays a computed view
    let payment = desk.submit_payment(
        &borrower,
        loan.id,
        loan.outstanding_balance,
        "screenshots/neft-20240201.png",
        &time,
    )?;
    let review = desk.approve_payment(&admin, payment.id, &time)?;
    println!(
        "\npayment approved: balance {}, status {}",
        review.loan.outstanding_balance, review.loan.status
    );

    let summary = desk.ledger_summary(&borrower, borrower.user_id)?;
    println!(
        "ledger: {} entries, {} paid in total",
        summary.total_transactions, summary.total_payment_amount
    );

    for event in desk.take_events() {
        println!("event: {:?}", event);
    }

    Ok(())
}
