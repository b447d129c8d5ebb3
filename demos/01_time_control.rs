/// time control - fees and interest under a controlled clock
use chrono::{Duration, TimeZone, Utc};
use loan_servicing::{
    ActivationDetails, Actor, FeeRule, InMemoryEventLog, InMemoryStore, LoanServicer, LoanTerms,
    Money, OverpaymentPolicy, PaymentSubmission, Rate, SafeTimeProvider, ServicingConfig,
    StatusRequest, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== time control example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let store = InMemoryStore::new();
    let events = InMemoryEventLog::new();
    let config = ServicingConfig {
        overpayment_policy: OverpaymentPolicy::RecordLeftover,
        ..ServicingConfig::default()
    };
    let servicer = LoanServicer::new(&store, &events, &time, config);

    let officer = Actor::new("loan officer");
    let borrower = Actor::new("borrower");

    let terms = LoanTerms::new(Money::from_major(1_200), Rate::from_percentage(12), 30)
        .with_grace_period(5)
        .with_late_fee(FeeRule::Fixed(Money::from_major(25)));
    let loan = servicer.open_loan(borrower.id, terms)?;

    servicer.change_status(loan.id, StatusRequest::Approve, &officer)?;
    let start = servicer.today();
    servicer.activate(
        loan.id,
        ActivationDetails {
            start_date: start,
            end_date: start + Duration::days(30),
            disbursement_method: "bank_transfer".to_string(),
            disbursement_reference: "TRX-0002".to_string(),
        },
        &officer,
    )?;
    println!("starting date: {}", start);

    // one month in: interest only
    controller.advance(Duration::days(30));
    let quote = servicer.payoff_quote(loan.id)?;
    println!("day 30 payoff: {} (interest {})", quote.total, quote.interest);

    let payment = servicer.submit_payment(
        loan.id,
        PaymentSubmission::new(Money::from_major(103), Uuid::new_v4()),
        &borrower,
    )?;
    let outcome = servicer.approve_payment(payment.id, &officer)?;
    println!("paid 103: {:?}", outcome.allocation());
    println!(
        "next due {:?} for {:?}",
        outcome.loan.ledger.next_payment_due_date, outcome.loan.ledger.next_payment_due_amount
    );

    // past the term and the grace period: late fee applies
    controller.advance(Duration::days(6));
    let quote = servicer.payoff_quote(loan.id)?;
    println!("day 36 payoff: {} (late fee {})", quote.total, quote.late_fee);

    let payment = servicer.submit_payment(
        loan.id,
        PaymentSubmission::new(quote.total, Uuid::new_v4()),
        &borrower,
    )?;
    let outcome = servicer.approve_payment(payment.id, &officer)?;
    println!("settled: {} (status {:?})", outcome.paid_off, outcome.loan.status);

    for event in events.events_for(loan.id) {
        println!("event: {}", event.name());
    }

    Ok(())
}
