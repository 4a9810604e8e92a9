use chrono::{NaiveDate, Timelike};
use hourglass_rs::SafeTimeProvider;
use parking_lot::Mutex;
use tracing::info;

use crate::charges::{Charge, FixedChargeGenerator, NewCharge};
use crate::config::LedgerConfig;
use crate::contracts::ContractSource;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LedgerEvent};
use crate::payments::{
    next_receipt_number, Allocation, AllocationDirective, AllocationEngine, AllocationOutcome,
    CancellationOutcome, NewPayment, Payment,
};
use crate::receivables::{
    AgingSummary, BatchSyncReport, DelinquencySynchronizer, NewReceivable, Receivable,
    ReceivableFilter, SyncReport,
};
use crate::reports::{self, ContractStatement, PaymentStatistics};
use crate::store::LedgerStore;
use crate::types::{
    AllocationId, BillingPeriod, ChargeId, CollectionStatus, ContractId, PaymentId, ReceivableId,
    TenantId,
};

/// billing ledger entry point: one method per externally visible operation
pub struct BillingEngine<C: ContractSource> {
    pub config: LedgerConfig,
    store: LedgerStore,
    contracts: C,
    events: Mutex<EventStore>,
    last_scheduled_run: Mutex<Option<NaiveDate>>,
}

fn today(time: &SafeTimeProvider) -> NaiveDate {
    time.now().date_naive()
}

impl<C: ContractSource> BillingEngine<C> {
    pub fn new(config: LedgerConfig, contracts: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: LedgerStore::new(),
            contracts,
            events: Mutex::new(EventStore::new()),
            last_scheduled_run: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn contracts(&self) -> &C {
        &self.contracts
    }

    pub fn take_events(&self) -> Vec<LedgerEvent> {
        self.events.lock().take_events()
    }

    fn emit(&self, events: impl IntoIterator<Item = LedgerEvent>) {
        self.events.lock().extend(events);
    }

    fn require_contract(&self, tenant_id: TenantId, contract_id: ContractId) -> Result<()> {
        self.contracts
            .contract(tenant_id, contract_id)
            .map(|_| ())
            .ok_or(LedgerError::ContractNotFound { id: contract_id })
    }

    // charges

    /// fails with `DuplicateCharge` when a live charge of the contract
    /// already has the same concept and due date
    pub fn create_charge(&self, tenant_id: TenantId, request: NewCharge) -> Result<Charge> {
        self.require_contract(tenant_id, request.contract_id)?;
        let charge = Charge::create(tenant_id, request)?;
        self.store
            .transaction(|tables| tables.insert_charge(charge.clone()))?;

        self.emit([LedgerEvent::ChargeCreated {
            tenant_id,
            charge_id: charge.id,
            contract_id: charge.contract_id,
            amount: charge.original_amount,
            due_date: charge.due_date,
        }]);
        Ok(charge)
    }

    /// fails with `ChargeHasPayments` once anything has been paid
    pub fn cancel_charge(
        &self,
        tenant_id: TenantId,
        charge_id: ChargeId,
        time: &SafeTimeProvider,
    ) -> Result<Charge> {
        let charge = self.store.transaction(|tables| {
            let charge = tables.charge_mut(tenant_id, charge_id)?;
            charge.cancel()?;
            Ok(charge.clone())
        })?;

        self.emit([LedgerEvent::ChargeCancelled {
            tenant_id,
            charge_id,
            timestamp: time.now(),
        }]);
        Ok(charge)
    }

    /// flag open charges past their due date; returns how many changed
    pub fn mark_overdue_charges(
        &self,
        tenant_id: TenantId,
        time: &SafeTimeProvider,
    ) -> Result<usize> {
        let as_of = today(time);
        let count = self.store.transaction(|tables| {
            Ok(tables
                .charges_mut(tenant_id)
                .map(|c| c.mark_overdue(as_of))
                .filter(|changed| *changed)
                .count())
        })?;

        if count > 0 {
            self.emit([LedgerEvent::ChargesMarkedOverdue {
                tenant_id,
                count,
                as_of,
            }]);
        }
        Ok(count)
    }

    pub fn generate_fixed_charges(
        &self,
        tenant_id: TenantId,
        period: BillingPeriod,
        contract_id: Option<ContractId>,
    ) -> Result<Vec<Charge>> {
        let generator =
            FixedChargeGenerator::new(&self.store, &self.contracts, &self.config.charges);
        let created = generator.generate(tenant_id, period, contract_id)?;

        info!(
            %tenant_id,
            year = period.year,
            month = period.month,
            created = created.len(),
            "fixed charges generated"
        );
        self.emit(created.iter().map(|c| LedgerEvent::ChargeCreated {
            tenant_id,
            charge_id: c.id,
            contract_id: c.contract_id,
            amount: c.original_amount,
            due_date: c.due_date,
        }));
        self.emit([LedgerEvent::FixedChargesGenerated {
            tenant_id,
            period,
            count: created.len(),
        }]);
        Ok(created)
    }

    pub fn charge(&self, tenant_id: TenantId, charge_id: ChargeId) -> Result<Charge> {
        self.store.read(|t| t.charge(tenant_id, charge_id).cloned())
    }

    /// ordered by due date
    pub fn charges_for_contract(
        &self,
        tenant_id: TenantId,
        contract_id: ContractId,
    ) -> Vec<Charge> {
        let mut charges: Vec<Charge> = self
            .store
            .read(|t| t.charges_for_contract(tenant_id, contract_id).cloned().collect());
        charges.sort_by_key(|c| c.due_date);
        charges
    }

    pub fn open_charges(&self, tenant_id: TenantId) -> Vec<Charge> {
        self.store
            .read(|t| t.charges(tenant_id).filter(|c| c.is_open()).cloned().collect())
    }

    /// open charges due strictly before today
    pub fn overdue_charges(&self, tenant_id: TenantId, time: &SafeTimeProvider) -> Vec<Charge> {
        let as_of = today(time);
        self.store.read(|t| {
            t.charges(tenant_id)
                .filter(|c| c.is_past_due(as_of))
                .cloned()
                .collect()
        })
    }

    pub fn charges_due_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Charge>> {
        if from > to {
            return Err(LedgerError::InvalidDate {
                message: format!("range start {} after end {}", from, to),
            });
        }
        Ok(self.store.read(|t| {
            t.charges(tenant_id)
                .filter(|c| c.due_date >= from && c.due_date <= to)
                .cloned()
                .collect()
        }))
    }

    // payments

    /// record a payment under the next receipt number, then apply the
    /// request's allocation directive. the payment stays recorded even when
    /// the allocation step fails.
    pub fn create_payment(
        &self,
        tenant_id: TenantId,
        request: NewPayment,
        time: &SafeTimeProvider,
    ) -> Result<(Payment, Option<AllocationOutcome>)> {
        self.require_contract(tenant_id, request.contract_id)?;

        let receipts = &self.config.receipts;
        let payment = self.store.transaction(|tables| {
            let receipt_number = next_receipt_number(
                tables.payments(tenant_id).map(|p| p.receipt_number.as_str()),
                receipts,
            );
            let payment = Payment::create(tenant_id, &request, receipt_number)?;
            tables.insert_payment(payment.clone())?;
            Ok(payment)
        })?;

        info!(
            %tenant_id,
            payment_id = %payment.id,
            receipt = %payment.receipt_number,
            amount = %payment.amount,
            "payment received"
        );
        self.emit([LedgerEvent::PaymentReceived {
            tenant_id,
            payment_id: payment.id,
            receipt_number: payment.receipt_number.clone(),
            amount: payment.amount,
            timestamp: time.now(),
        }]);

        let outcome = match &request.allocation {
            AllocationDirective::None => None,
            AllocationDirective::Automatic => {
                Some(self.allocate_automatic(tenant_id, payment.id, time)?)
            }
            AllocationDirective::Explicit(ids) => {
                Some(self.allocate_explicit(tenant_id, payment.id, ids, time)?)
            }
        };
        let payment = self.payment(tenant_id, payment.id)?;
        Ok((payment, outcome))
    }

    pub fn allocate_automatic(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        time: &SafeTimeProvider,
    ) -> Result<AllocationOutcome> {
        let outcome = AllocationEngine::new(&self.store).allocate_automatic(
            tenant_id,
            payment_id,
            today(time),
        )?;
        self.emit_allocations(tenant_id, &outcome);
        Ok(outcome)
    }

    /// steps committed before an unknown charge id stay applied
    pub fn allocate_explicit(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        charge_ids: &[ChargeId],
        time: &SafeTimeProvider,
    ) -> Result<AllocationOutcome> {
        let outcome = AllocationEngine::new(&self.store).allocate_explicit(
            tenant_id,
            payment_id,
            charge_ids,
            today(time),
        )?;
        self.emit_allocations(tenant_id, &outcome);
        Ok(outcome)
    }

    pub fn allocate_manual(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        charge_id: ChargeId,
        amount: Money,
        time: &SafeTimeProvider,
    ) -> Result<AllocationOutcome> {
        let outcome = AllocationEngine::new(&self.store).allocate_manual(
            tenant_id,
            payment_id,
            charge_id,
            amount,
            today(time),
        )?;
        self.emit_allocations(tenant_id, &outcome);
        Ok(outcome)
    }

    pub fn reverse_allocation(
        &self,
        tenant_id: TenantId,
        allocation_id: AllocationId,
    ) -> Result<Allocation> {
        let allocation =
            AllocationEngine::new(&self.store).reverse_allocation(tenant_id, allocation_id)?;
        self.emit([LedgerEvent::AllocationReversed {
            tenant_id,
            payment_id: allocation.payment_id,
            charge_id: allocation.charge_id,
            amount: allocation.amount,
        }]);
        Ok(allocation)
    }

    pub fn cancel_payment(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        time: &SafeTimeProvider,
    ) -> Result<CancellationOutcome> {
        let outcome = AllocationEngine::new(&self.store).cancel_payment(tenant_id, payment_id)?;
        self.emit(outcome.reversed.iter().map(|a| LedgerEvent::AllocationReversed {
            tenant_id,
            payment_id,
            charge_id: a.charge_id,
            amount: a.amount,
        }));
        self.emit([LedgerEvent::PaymentCancelled {
            tenant_id,
            payment_id,
            reversed_amount: outcome.reversed_amount,
            timestamp: time.now(),
        }]);
        Ok(outcome)
    }

    fn emit_allocations(&self, tenant_id: TenantId, outcome: &AllocationOutcome) {
        self.emit(outcome.allocations.iter().map(|a| LedgerEvent::PaymentAllocated {
            tenant_id,
            payment_id: a.payment_id,
            allocation_id: a.id,
            charge_id: a.charge_id,
            amount: a.amount,
            payment_status: outcome.payment_status,
        }));
    }

    pub fn payment(&self, tenant_id: TenantId, payment_id: PaymentId) -> Result<Payment> {
        self.store.read(|t| t.payment(tenant_id, payment_id).cloned())
    }

    /// newest payment date first
    pub fn payments_for_contract(
        &self,
        tenant_id: TenantId,
        contract_id: ContractId,
    ) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self.store.read(|t| {
            t.payments(tenant_id)
                .filter(|p| p.contract_id == contract_id)
                .cloned()
                .collect()
        });
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        payments
    }

    pub fn payments_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Payment>> {
        if from > to {
            return Err(LedgerError::InvalidDate {
                message: format!("range start {} after end {}", from, to),
            });
        }
        Ok(self.store.read(|t| {
            t.payments(tenant_id)
                .filter(|p| p.payment_date >= from && p.payment_date <= to)
                .cloned()
                .collect()
        }))
    }

    pub fn allocations_for_payment(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
    ) -> Vec<Allocation> {
        self.store
            .read(|t| t.allocations_for_payment(tenant_id, payment_id).cloned().collect())
    }

    pub fn allocations_for_charge(
        &self,
        tenant_id: TenantId,
        charge_id: ChargeId,
    ) -> Vec<Allocation> {
        self.store
            .read(|t| t.allocations_for_charge(tenant_id, charge_id).cloned().collect())
    }

    // receivables

    pub fn create_receivable(
        &self,
        tenant_id: TenantId,
        request: NewReceivable,
        time: &SafeTimeProvider,
    ) -> Result<Receivable> {
        let receivable = Receivable::create(tenant_id, request, today(time))?;
        self.store.transaction(|tables| tables.insert_receivable(receivable.clone()))?;

        self.emit([LedgerEvent::ReceivableOpened {
            tenant_id,
            receivable_id: receivable.id,
            contract_id: receivable.contract_id,
            pending_amount: receivable.pending_amount,
            due_date: receivable.due_date,
        }]);
        Ok(receivable)
    }

    fn update_receivable<F>(
        &self,
        tenant_id: TenantId,
        receivable_id: ReceivableId,
        f: F,
    ) -> Result<Receivable>
    where
        F: FnOnce(&mut Receivable) -> Result<()>,
    {
        let receivable = self.store.transaction(|tables| {
            let receivable = tables.receivable_mut(tenant_id, receivable_id)?;
            f(receivable)?;
            Ok(receivable.clone())
        })?;

        self.emit([LedgerEvent::ReceivableUpdated {
            tenant_id,
            receivable_id,
            pending_amount: receivable.pending_amount,
            collection_status: receivable.collection_status,
        }]);
        Ok(receivable)
    }

    pub fn update_collection_status(
        &self,
        tenant_id: TenantId,
        receivable_id: ReceivableId,
        status: CollectionStatus,
        time: &SafeTimeProvider,
    ) -> Result<Receivable> {
        let as_of = today(time);
        self.update_receivable(tenant_id, receivable_id, |r| {
            r.set_collection_status(status, as_of);
            Ok(())
        })
    }

    pub fn register_collection_payment(
        &self,
        tenant_id: TenantId,
        receivable_id: ReceivableId,
        amount: Money,
        time: &SafeTimeProvider,
    ) -> Result<Receivable> {
        let as_of = today(time);
        self.update_receivable(tenant_id, receivable_id, |r| {
            r.register_collection_payment(amount, as_of)
        })
    }

    pub fn apply_percentage_penalty(
        &self,
        tenant_id: TenantId,
        receivable_id: ReceivableId,
        time: &SafeTimeProvider,
    ) -> Result<Receivable> {
        let as_of = today(time);
        self.update_receivable(tenant_id, receivable_id, |r| {
            r.apply_percentage_penalty(as_of);
            Ok(())
        })
    }

    /// soft delete
    pub fn deactivate_receivable(
        &self,
        tenant_id: TenantId,
        receivable_id: ReceivableId,
        time: &SafeTimeProvider,
    ) -> Result<Receivable> {
        let as_of = today(time);
        self.update_receivable(tenant_id, receivable_id, |r| {
            r.deactivate(as_of);
            Ok(())
        })
    }

    pub fn receivable(
        &self,
        tenant_id: TenantId,
        receivable_id: ReceivableId,
    ) -> Result<Receivable> {
        self.store.read(|t| t.receivable(tenant_id, receivable_id).cloned())
    }

    /// ordered by due date
    pub fn receivables(&self, tenant_id: TenantId, filter: ReceivableFilter) -> Vec<Receivable> {
        let mut receivables: Vec<Receivable> = self.store.read(|t| {
            t.receivables(tenant_id)
                .filter(|r| filter.matches(r))
                .cloned()
                .collect()
        });
        receivables.sort_by_key(|r| r.due_date);
        receivables
    }

    pub fn aging_summary(&self, tenant_id: TenantId, time: &SafeTimeProvider) -> AgingSummary {
        let as_of = today(time);
        self.store
            .read(|t| AgingSummary::from_receivables(tenant_id, as_of, t.receivables(tenant_id)))
    }

    // delinquency synchronizer

    /// on-demand run for one tenant scope
    pub fn sync_tenant(&self, tenant_id: TenantId, time: &SafeTimeProvider) -> Result<SyncReport> {
        let synchronizer = DelinquencySynchronizer::new(&self.store, &self.contracts);
        match synchronizer.sync_tenant(tenant_id, today(time)) {
            Ok((report, events)) => {
                self.emit(events);
                Ok(report)
            }
            Err(err) => {
                self.emit([LedgerEvent::DelinquencySyncFailed {
                    tenant_id,
                    reason: err.to_string(),
                    as_of: today(time),
                }]);
                Err(err)
            }
        }
    }

    /// run over every tenant scope; failures are collected, never raised
    pub fn sync_all(&self, time: &SafeTimeProvider) -> BatchSyncReport {
        let (batch, events) =
            DelinquencySynchronizer::new(&self.store, &self.contracts).sync_all(today(time));
        self.emit(events);
        batch
    }

    /// daily job hook: runs `sync_all` at most once per calendar day, at or
    /// after the configured hour. returns None when nothing ran.
    pub fn run_scheduled_sync(&self, time: &SafeTimeProvider) -> Option<BatchSyncReport> {
        let now = time.now();
        if now.hour() < self.config.sync.daily_run_hour {
            return None;
        }

        let as_of = now.date_naive();
        {
            let mut last = self.last_scheduled_run.lock();
            if *last == Some(as_of) {
                return None;
            }
            *last = Some(as_of);
        }

        info!(as_of = %as_of, "scheduled delinquency sync");
        Some(self.sync_all(time))
    }

    // reporting

    pub fn balance_pending_for_contract(
        &self,
        tenant_id: TenantId,
        contract_id: ContractId,
    ) -> Money {
        self.store
            .read(|t| reports::balance_pending_for_contract(t, tenant_id, contract_id))
    }

    pub fn payment_statistics(
        &self,
        tenant_id: TenantId,
        time: &SafeTimeProvider,
    ) -> PaymentStatistics {
        let as_of = today(time);
        self.store
            .read(|t| PaymentStatistics::compute(t, tenant_id, as_of))
    }

    pub fn contract_statement(
        &self,
        tenant_id: TenantId,
        contract_id: ContractId,
        time: &SafeTimeProvider,
    ) -> Result<ContractStatement> {
        self.require_contract(tenant_id, contract_id)?;
        let as_of = today(time);
        Ok(self
            .store
            .read(|t| ContractStatement::build(t, tenant_id, contract_id, as_of)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ContractTerms, InMemoryContracts};
    use crate::errors::ErrorKind;
    use crate::types::{AgingBucket, ChargeKind, ChargeStatus, PaymentMethod, PaymentStatus};
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    struct Setup {
        engine: BillingEngine<InMemoryContracts>,
        time: SafeTimeProvider,
        tenant: TenantId,
        contract: ContractTerms,
    }

    fn setup() -> Setup {
        let tenant = Uuid::new_v4();
        let contract = ContractTerms::new(
            tenant,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(1000),
        )
        .with_due_day(5)
        .with_grace_period(10)
        .with_daily_penalty(Money::from_decimal(dec!(5.00)));

        let contracts = InMemoryContracts::new();
        contracts.upsert(contract.clone());

        Setup {
            engine: BillingEngine::new(LedgerConfig::default(), contracts).unwrap(),
            time: SafeTimeProvider::new(TimeSource::Test(
                Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap(),
            )),
            tenant,
            contract,
        }
    }

    fn period(month: u32) -> BillingPeriod {
        BillingPeriod::new(2025, month).unwrap()
    }

    #[test]
    fn test_create_charge_requires_contract() {
        let s = setup();
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let request = NewCharge::new(
            Uuid::new_v4(),
            ChargeKind::Maintenance,
            "Mantenimiento",
            Money::from_major(50),
            day,
            day,
        );
        let err = s.engine.create_charge(s.tenant, request).unwrap_err();
        assert!(matches!(err, LedgerError::ContractNotFound { .. }));

        let request = NewCharge::new(
            s.contract.contract_id,
            ChargeKind::Maintenance,
            "Mantenimiento",
            Money::from_major(50),
            day,
            day,
        );
        let charge = s.engine.create_charge(s.tenant, request).unwrap();
        assert_eq!(charge.status, ChargeStatus::Pending);
        assert!(s
            .engine
            .take_events()
            .iter()
            .any(|e| matches!(e, LedgerEvent::ChargeCreated { .. })));
    }

    #[test]
    fn test_create_charge_rejects_taken_key() {
        let s = setup();
        let day = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let request = NewCharge::new(
            s.contract.contract_id,
            ChargeKind::Maintenance,
            "Mantenimiento",
            Money::from_major(1000),
            day,
            day,
        );
        let mut smaller = request.clone();
        smaller.amount = Money::from_major(500);

        let first = s.engine.create_charge(s.tenant, request.clone()).unwrap();
        let err = s.engine.create_charge(s.tenant, smaller).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateCharge { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            s.engine.charges_for_contract(s.tenant, s.contract.contract_id).len(),
            1
        );

        s.engine.cancel_charge(s.tenant, first.id, &s.time).unwrap();
        assert!(s.engine.create_charge(s.tenant, request).is_ok());
    }

    #[test]
    fn test_receipts_are_sequential_per_tenant() {
        let s = setup();
        let request = NewPayment::new(
            s.contract.contract_id,
            s.contract.lessee_id,
            Money::from_major(100),
            PaymentMethod::Cash,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );

        let (first, _) = s.engine.create_payment(s.tenant, request.clone(), &s.time).unwrap();
        let (second, _) = s.engine.create_payment(s.tenant, request, &s.time).unwrap();
        assert_eq!(first.receipt_number, "REC-000001");
        assert_eq!(second.receipt_number, "REC-000002");
    }

    #[test]
    fn test_payment_with_automatic_directive() {
        let s = setup();
        for month in 1..=3 {
            s.engine
                .generate_fixed_charges(s.tenant, period(month), None)
                .unwrap();
        }

        let request = NewPayment::new(
            s.contract.contract_id,
            s.contract.lessee_id,
            Money::from_major(1500),
            PaymentMethod::Transfer,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
        .with_allocation(AllocationDirective::Automatic);

        let (payment, outcome) = s.engine.create_payment(s.tenant, request, &s.time).unwrap();
        let outcome = outcome.unwrap();
        assert_eq!(payment.status, PaymentStatus::Applied);
        assert_eq!(outcome.allocations.len(), 2);

        let charges = s.engine.charges_for_contract(s.tenant, s.contract.contract_id);
        assert_eq!(charges[0].status, ChargeStatus::Paid);
        assert_eq!(charges[1].pending_amount, Money::from_major(500));
        assert_eq!(charges[2].pending_amount, Money::from_major(1000));
        assert_eq!(
            s.engine.balance_pending_for_contract(s.tenant, s.contract.contract_id),
            Money::from_major(1500)
        );
    }

    #[test]
    fn test_overdue_flow_through_sync_and_collections() {
        let s = setup();
        s.engine
            .generate_fixed_charges(s.tenant, period(1), None)
            .unwrap();

        // jan 5 due date + 35 days = feb 9
        s.time.test_control().unwrap().advance(Duration::days(39));
        assert_eq!(s.engine.mark_overdue_charges(s.tenant, &s.time).unwrap(), 1);
        assert_eq!(s.engine.overdue_charges(s.tenant, &s.time).len(), 1);

        let report = s.engine.sync_tenant(s.tenant, &s.time).unwrap();
        assert_eq!(report.created, 1);

        let receivables = s
            .engine
            .receivables(s.tenant, ReceivableFilter::Bucket(AgingBucket::Overdue31To60));
        assert_eq!(receivables.len(), 1);
        assert_eq!(receivables[0].penalty_amount, Money::from_decimal(dec!(125.00)));

        let updated = s
            .engine
            .update_collection_status(
                s.tenant,
                receivables[0].id,
                CollectionStatus::Promised,
                &s.time,
            )
            .unwrap();
        assert_eq!(updated.collection_status, CollectionStatus::Promised);

        let summary = s.engine.aging_summary(s.tenant, &s.time);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.total_due, Money::from_major(1125));
    }

    #[test]
    fn test_cancel_charge_guard() {
        let s = setup();
        let created = s
            .engine
            .generate_fixed_charges(s.tenant, period(1), None)
            .unwrap();
        let charge_id = created[0].id;

        let request = NewPayment::new(
            s.contract.contract_id,
            s.contract.lessee_id,
            Money::from_major(10),
            PaymentMethod::Cash,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
        .with_allocation(AllocationDirective::Explicit(vec![charge_id]));
        s.engine.create_payment(s.tenant, request, &s.time).unwrap();

        let before = s.engine.charge(s.tenant, charge_id).unwrap();
        let err = s.engine.cancel_charge(s.tenant, charge_id, &s.time).unwrap_err();
        assert!(matches!(err, LedgerError::ChargeHasPayments { .. }));
        assert_eq!(s.engine.charge(s.tenant, charge_id).unwrap(), before);
    }

    #[test]
    fn test_scheduled_sync_runs_once_per_day() {
        let s = setup();
        let early = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2025, 2, 1, 5, 59, 0).unwrap(),
        ));
        assert!(s.engine.run_scheduled_sync(&early).is_none());

        early.test_control().unwrap().advance(Duration::minutes(1));
        assert!(s.engine.run_scheduled_sync(&early).is_some());
        assert!(s.engine.run_scheduled_sync(&early).is_none());

        early.test_control().unwrap().advance(Duration::days(1));
        assert!(s.engine.run_scheduled_sync(&early).is_some());
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let s = setup();
        let a = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(s.engine.charges_due_between(s.tenant, a, b).is_err());
        assert!(s.engine.payments_between(s.tenant, a, b).is_err());
        assert!(s.engine.charges_due_between(s.tenant, b, a).unwrap().is_empty());
    }
}
