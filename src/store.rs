use chrono::NaiveDate;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::charges::Charge;
use crate::errors::{LedgerError, Result};
use crate::payments::{Allocation, Payment};
use crate::receivables::Receivable;
use crate::types::{
    AllocationId, ChargeId, ChargeStatus, ContractId, PaymentId, ReceivableId, TenantId,
};

/// the ledger's tables. every accessor is tenant-scoped: a record owned by
/// another tenant scope is reported as not found.
#[derive(Debug, Clone, Default)]
pub struct LedgerTables {
    charges: BTreeMap<ChargeId, Charge>,
    payments: BTreeMap<PaymentId, Payment>,
    allocations: BTreeMap<AllocationId, Allocation>,
    receivables: BTreeMap<ReceivableId, Receivable>,
}

impl LedgerTables {
    // charges

    /// insert a charge; (contract, concept, due date) is unique among
    /// charges that are not cancelled
    pub fn insert_charge(&mut self, charge: Charge) -> Result<()> {
        if charge.status != ChargeStatus::Cancelled {
            let taken = self
                .charge_by_key(
                    charge.tenant_id,
                    charge.contract_id,
                    &charge.concept,
                    charge.due_date,
                )
                .is_some();
            if taken {
                return Err(LedgerError::DuplicateCharge {
                    contract_id: charge.contract_id,
                    concept: charge.concept,
                    due_date: charge.due_date,
                });
            }
        }
        self.charges.insert(charge.id, charge);
        Ok(())
    }

    pub fn charge(&self, tenant_id: TenantId, id: ChargeId) -> Result<&Charge> {
        self.charges
            .get(&id)
            .filter(|c| c.tenant_id == tenant_id)
            .ok_or(LedgerError::ChargeNotFound { id })
    }

    pub fn charge_mut(&mut self, tenant_id: TenantId, id: ChargeId) -> Result<&mut Charge> {
        self.charges
            .get_mut(&id)
            .filter(|c| c.tenant_id == tenant_id)
            .ok_or(LedgerError::ChargeNotFound { id })
    }

    pub fn charges(&self, tenant_id: TenantId) -> impl Iterator<Item = &Charge> {
        self.charges.values().filter(move |c| c.tenant_id == tenant_id)
    }

    pub fn charges_mut(&mut self, tenant_id: TenantId) -> impl Iterator<Item = &mut Charge> {
        self.charges
            .values_mut()
            .filter(move |c| c.tenant_id == tenant_id)
    }

    pub fn charges_for_contract(
        &self,
        tenant_id: TenantId,
        contract_id: ContractId,
    ) -> impl Iterator<Item = &Charge> {
        self.charges(tenant_id)
            .filter(move |c| c.contract_id == contract_id)
    }

    /// the live (not cancelled) charge matching a receivable's natural key
    pub fn charge_by_key(
        &self,
        tenant_id: TenantId,
        contract_id: ContractId,
        concept: &str,
        due_date: NaiveDate,
    ) -> Option<&Charge> {
        self.charges_for_contract(tenant_id, contract_id).find(|c| {
            c.status != ChargeStatus::Cancelled && c.concept == concept && c.due_date == due_date
        })
    }

    // payments

    /// insert a payment; receipt numbers are unique per tenant scope
    pub fn insert_payment(&mut self, payment: Payment) -> Result<()> {
        let taken = self
            .payments(payment.tenant_id)
            .any(|p| p.receipt_number == payment.receipt_number);
        if taken {
            return Err(LedgerError::DuplicateReceipt {
                receipt_number: payment.receipt_number,
            });
        }
        self.payments.insert(payment.id, payment);
        Ok(())
    }

    pub fn payment(&self, tenant_id: TenantId, id: PaymentId) -> Result<&Payment> {
        self.payments
            .get(&id)
            .filter(|p| p.tenant_id == tenant_id)
            .ok_or(LedgerError::PaymentNotFound { id })
    }

    pub fn payment_mut(&mut self, tenant_id: TenantId, id: PaymentId) -> Result<&mut Payment> {
        self.payments
            .get_mut(&id)
            .filter(|p| p.tenant_id == tenant_id)
            .ok_or(LedgerError::PaymentNotFound { id })
    }

    pub fn payments(&self, tenant_id: TenantId) -> impl Iterator<Item = &Payment> {
        self.payments.values().filter(move |p| p.tenant_id == tenant_id)
    }

    // allocations

    pub fn insert_allocation(&mut self, allocation: Allocation) {
        self.allocations.insert(allocation.id, allocation);
    }

    /// allocations are deleted outright on reversal
    pub fn remove_allocation(
        &mut self,
        tenant_id: TenantId,
        id: AllocationId,
    ) -> Option<Allocation> {
        match self.allocations.get(&id) {
            Some(a) if a.tenant_id == tenant_id => self.allocations.remove(&id),
            _ => None,
        }
    }

    pub fn allocations(&self, tenant_id: TenantId) -> impl Iterator<Item = &Allocation> {
        self.allocations
            .values()
            .filter(move |a| a.tenant_id == tenant_id)
    }

    pub fn allocations_for_payment(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
    ) -> impl Iterator<Item = &Allocation> {
        self.allocations(tenant_id)
            .filter(move |a| a.payment_id == payment_id)
    }

    pub fn allocations_for_charge(
        &self,
        tenant_id: TenantId,
        charge_id: ChargeId,
    ) -> impl Iterator<Item = &Allocation> {
        self.allocations(tenant_id)
            .filter(move |a| a.charge_id == charge_id)
    }

    // receivables

    /// insert a receivable; (tenant, contract, concept, due date) is unique
    pub fn insert_receivable(&mut self, receivable: Receivable) -> Result<()> {
        let existing = self.receivable_by_key(
            receivable.tenant_id,
            receivable.contract_id,
            &receivable.concept,
            receivable.due_date,
        );
        if existing.is_some() {
            return Err(LedgerError::DuplicateReceivable {
                contract_id: receivable.contract_id,
                concept: receivable.concept,
                due_date: receivable.due_date,
            });
        }
        self.receivables.insert(receivable.id, receivable);
        Ok(())
    }

    pub fn receivable(&self, tenant_id: TenantId, id: ReceivableId) -> Result<&Receivable> {
        self.receivables
            .get(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .ok_or(LedgerError::ReceivableNotFound { id })
    }

    pub fn receivable_mut(
        &mut self,
        tenant_id: TenantId,
        id: ReceivableId,
    ) -> Result<&mut Receivable> {
        self.receivables
            .get_mut(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .ok_or(LedgerError::ReceivableNotFound { id })
    }

    pub fn receivables(&self, tenant_id: TenantId) -> impl Iterator<Item = &Receivable> {
        self.receivables
            .values()
            .filter(move |r| r.tenant_id == tenant_id)
    }

    pub fn receivable_by_key(
        &self,
        tenant_id: TenantId,
        contract_id: ContractId,
        concept: &str,
        due_date: NaiveDate,
    ) -> Option<&Receivable> {
        self.receivables(tenant_id).find(|r| {
            r.contract_id == contract_id && r.concept == concept && r.due_date == due_date
        })
    }

    /// tenant scopes that own at least one record
    pub fn tenant_ids(&self) -> BTreeSet<TenantId> {
        self.charges
            .values()
            .map(|c| c.tenant_id)
            .chain(self.payments.values().map(|p| p.tenant_id))
            .chain(self.receivables.values().map(|r| r.tenant_id))
            .collect()
    }
}

/// in-process persistence with serializable, all-or-nothing transactions
#[derive(Debug, Default)]
pub struct LedgerStore {
    tables: Mutex<LedgerTables>,
    sync_guards: DashMap<TenantId, Arc<Mutex<()>>>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// run `f` with exclusive access to the tables. on `Err` every change
    /// made inside the closure is discarded.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerTables) -> Result<T>,
    {
        let mut tables = self.tables.lock();
        let snapshot = tables.clone();
        match f(&mut tables) {
            Ok(value) => Ok(value),
            Err(err) => {
                *tables = snapshot;
                Err(err)
            }
        }
    }

    /// read-only access
    pub fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&LedgerTables) -> T,
    {
        let tables = self.tables.lock();
        f(&tables)
    }

    /// mutual-exclusion guard for one tenant scope's synchronizer
    pub fn sync_guard(&self, tenant_id: TenantId) -> Arc<Mutex<()>> {
        self.sync_guards
            .entry(tenant_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
