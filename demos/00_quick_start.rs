/// quick start - open, disburse and repay a loan
use loan_servicing::{
    ActivationDetails, Actor, InMemoryEventLog, InMemoryStore, LoanServicer, LoanTerms, Money,
    PaymentSubmission, Rate, SafeTimeProvider, ServicingConfig, StatusRequest, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // production: use system time
    let time = SafeTimeProvider::new(TimeSource::System);
    let store = InMemoryStore::new();
    let events = InMemoryEventLog::new();
    let servicer = LoanServicer::new(&store, &events, &time, ServicingConfig::default());

    let officer = Actor::new("loan officer");
    let borrower = Actor::new("borrower");

    // a $1,200 loan at 12% repaid over 30 days
    let terms = LoanTerms::new(Money::from_major(1_200), Rate::from_percentage(12), 30);
    let loan = servicer.open_loan(borrower.id, terms)?;

    servicer.change_status(loan.id, StatusRequest::Approve, &officer)?;
    let today = servicer.today();
    servicer.activate(
        loan.id,
        ActivationDetails {
            start_date: today,
            end_date: today + chrono::Duration::days(30),
            disbursement_method: "bank_transfer".to_string(),
            disbursement_reference: "TRX-0001".to_string(),
        },
        &officer,
    )?;

    let payment = servicer.submit_payment(
        loan.id,
        PaymentSubmission::new(Money::from_major(300), Uuid::new_v4()),
        &borrower,
    )?;
    let outcome = servicer.approve_payment(payment.id, &officer)?;
    println!("allocation: {:?}", outcome.allocation());

    println!("{}", servicer.view(loan.id)?.to_json_pretty()?);
    Ok(())
}
