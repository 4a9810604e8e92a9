/// delinquency sync - age unpaid rent into receivables with controlled time
use chrono::{Duration, TimeZone, Utc};
use lease_billing_ledger::{
    BillingEngine, BillingPeriod, ContractTerms, InMemoryContracts, LedgerConfig, Money,
    ReceivableFilter, SafeTimeProvider, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== delinquency sync example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 1, 1, 7, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let tenant = Uuid::new_v4();
    let contract = ContractTerms::new(
        tenant,
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Money::from_major(950),
    )
    .with_due_day(5)
    .with_grace_period(10)
    .with_daily_penalty(Money::from_decimal(dec!(5.00)));

    let contracts = InMemoryContracts::new();
    contracts.upsert(contract);
    let engine = BillingEngine::new(LedgerConfig::default(), contracts)?;

    for month in 1..=3 {
        engine.generate_fixed_charges(tenant, BillingPeriod::new(2025, month)?, None)?;
    }

    // move to mid-march without any payment
    controller.advance(Duration::days(73));
    println!("today: {}", time.now().format("%Y-%m-%d"));

    let marked = engine.mark_overdue_charges(tenant, &time)?;
    println!("charges marked overdue: {}", marked);

    if let Some(batch) = engine.run_scheduled_sync(&time) {
        for report in &batch.reports {
            println!(
                "tenant {}: created {}, updated {}, settled {}",
                report.tenant_id, report.created, report.updated, report.deactivated
            );
        }
    }

    for r in engine.receivables(tenant, ReceivableFilter::Active) {
        println!(
            "{:<22} due {} | {:>3} days | {:?} | pending {} | penalty {}",
            r.concept,
            r.due_date,
            r.days_overdue,
            r.aging_bucket,
            r.pending_amount,
            r.penalty_amount
        );
    }

    println!("\naging summary:");
    println!("{}", engine.aging_summary(tenant, &time).to_json_pretty()?);

    // a second run on the same day changes nothing
    let again = engine.sync_tenant(tenant, &time)?;
    println!("\nsecond run no-op: {}", again.is_noop());

    Ok(())
}
