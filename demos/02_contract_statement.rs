/// contract statement - allocations, cancellation and a json statement
use chrono::{TimeZone, Utc};
use lease_billing_ledger::{
    AllocationDirective, BillingEngine, BillingPeriod, ChargeKind, ContractTerms,
    InMemoryContracts, LedgerConfig, Money, NewCharge, NewPayment, PaymentMethod,
    SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== contract statement example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 4, 20, 12, 0, 0).unwrap(),
    ));
    let today = time.now().date_naive();

    let tenant = Uuid::new_v4();
    let contract = ContractTerms::new(
        tenant,
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Money::from_major(700),
    );
    let contract_id = contract.contract_id;
    let payer = contract.lessee_id;

    let contracts = InMemoryContracts::new();
    contracts.upsert(contract);
    let engine = BillingEngine::new(LedgerConfig::default(), contracts)?;

    engine.generate_fixed_charges(tenant, BillingPeriod::new(2025, 4)?, Some(contract_id))?;
    let deposit = engine.create_charge(
        tenant,
        NewCharge::new(
            contract_id,
            ChargeKind::Deposit,
            "Deposito en garantia",
            Money::from_major(700),
            today,
            today,
        ),
    )?;

    // pay the deposit first, explicitly
    let request = NewPayment::new(
        contract_id,
        payer,
        Money::from_major(900),
        PaymentMethod::Cash,
        today,
    )
    .with_allocation(AllocationDirective::Explicit(vec![deposit.id]));
    let (first, _) = engine.create_payment(tenant, request, &time)?;
    println!("{} allocated {}", first.receipt_number, first.allocated_amount);

    // a second payment that is later cancelled
    let request = NewPayment::new(
        contract_id,
        payer,
        Money::from_major(300),
        PaymentMethod::Check,
        today,
    )
    .with_allocation(AllocationDirective::Automatic);
    let (second, _) = engine.create_payment(tenant, request, &time)?;
    let cancelled = engine.cancel_payment(tenant, second.id, &time)?;
    println!("{} cancelled, reversed {}", second.receipt_number, cancelled.reversed_amount);

    // spread what is left of the first payment
    engine.allocate_automatic(tenant, first.id, &time)?;

    let statement = engine.contract_statement(tenant, contract_id, &time)?;
    println!("{}", statement.to_json_pretty()?);

    println!("\nevents:");
    for event in engine.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
