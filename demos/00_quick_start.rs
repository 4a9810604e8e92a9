/// quick start - bill a month of rent and apply a payment
use lease_billing_ledger::{
    AllocationDirective, BillingEngine, BillingPeriod, ContractTerms, InMemoryContracts,
    LedgerConfig, Money, NewPayment, PaymentMethod, SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tenant = Uuid::new_v4();
    let contract = ContractTerms::new(
        tenant,
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Money::from_major(1_200),
    )
    .with_due_day(5);

    let contracts = InMemoryContracts::new();
    contracts.upsert(contract.clone());

    let engine = BillingEngine::new(LedgerConfig::default(), contracts)?;
    let time = SafeTimeProvider::new(TimeSource::System);

    // bill this month's rent
    let period = BillingPeriod::containing(time.now().date_naive());
    engine.generate_fixed_charges(tenant, period, None)?;

    // receive a partial payment and apply it oldest-first
    let request = NewPayment::new(
        contract.contract_id,
        contract.lessee_id,
        Money::from_major(800),
        PaymentMethod::Transfer,
        time.now().date_naive(),
    )
    .with_allocation(AllocationDirective::Automatic);
    let (payment, _) = engine.create_payment(tenant, request, &time)?;

    println!("receipt {} -> {:?}", payment.receipt_number, payment.status);
    println!(
        "pending on contract: {}",
        engine.balance_pending_for_contract(tenant, contract.contract_id)
    );

    Ok(())
}
