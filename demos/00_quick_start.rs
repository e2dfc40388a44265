/// quick start - apply, approve and inspect a loan
use microloan_engine::{
    Actor, EngineConfig, InMemoryStore, LoanDesk, LoanRequest, Money, SafeTimeProvider,
    TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let desk = LoanDesk::new(InMemoryStore::new(), EngineConfig::standard())?;
    let time = SafeTimeProvider::new(TimeSource::System);

    let borrower = Actor::borrower(Uuid::new_v4());
    let admin = Actor::admin(Uuid::new_v4());

    // borrow 5,000 against the default 10,000 limit
    let loan = desk.apply_for_loan(
        &borrower,
        LoanRequest::new(borrower.user_id, Money::from_major(5_000), "inventory"),
        &time,
    )?;
    println!("applied: {} due {}", loan.principal, loan.due_date.format("%Y-%m-%d"));

    // approval folds the single-period interest into the balance
    let loan = desk.approve_loan(&admin, loan.id, &time)?;
    println!("approved, balance now {}", loan.outstanding_balance);

    println!("{}", desk.loan_view(&borrower, loan.id, &time)?.to_json_pretty()?);

    Ok(())
}
